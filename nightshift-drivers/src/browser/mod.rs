pub mod behavioral;
pub mod driver;
pub mod launch;
pub mod session;
