//! Selector tables for the portal login page and the report center.
//!
//! Paths are anchored to the DOM the portal currently serves. When the site
//! changes, this is the only file that should need editing.
use nightshift_config::ReportConfig;
use nightshift_drivers::locator::xpath_literal;
use nightshift_drivers::{SelectorStrategy, UiTarget};

/// Dashboard hook that opens the report center in a new tab. Returns a
/// description of what it did, or `null`.
pub const OPEN_REPORT_CENTER: &str = r#"
if (typeof showReportCenter === 'function') {
    showReportCenter();
    return 'Executed showReportCenter() directly';
}
const btn = document.querySelector('div[onclick*="showReportCenter"]')
    || document.querySelector('#main-topPanel > div.header-nav > div:nth-child(7)');
if (btn) {
    btn.click();
    return 'Clicked element via JS';
}
return null;
"#;

/// Click the first button whose text contains `arguments[0]`.
pub const CLICK_BUTTON_BY_TEXT: &str = r#"
const wanted = arguments[0];
const btn = Array.from(document.querySelectorAll('button'))
    .find(b => b.textContent.includes(wanted));
if (btn) {
    btn.click();
    return true;
}
return false;
"#;

const FILTER_PANEL: &str = r#"//div[contains(@class, "css-xn5mga")]"#;

pub fn captcha_image() -> UiTarget {
    UiTarget::new("captcha image", vec![SelectorStrategy::direct("#lwm")])
}

pub fn username_input() -> UiTarget {
    UiTarget::new("username field", vec![SelectorStrategy::direct("#loginAccount")])
}

pub fn password_input() -> UiTarget {
    UiTarget::new("password field", vec![SelectorStrategy::direct("#loginPassword")])
}

pub fn captcha_input() -> UiTarget {
    UiTarget::new("captcha field", vec![SelectorStrategy::direct("#phraseLogin")])
}

pub fn login_submit() -> UiTarget {
    UiTarget::new("login button", vec![SelectorStrategy::direct("#loginSubmit")])
}

pub fn interstitial_details() -> UiTarget {
    UiTarget::new("interstitial details", vec![SelectorStrategy::direct("#details-button")])
}

pub fn interstitial_proceed() -> UiTarget {
    UiTarget::new("interstitial proceed", vec![SelectorStrategy::direct("#proceed-link")])
}

pub fn report_category(cfg: &ReportConfig) -> UiTarget {
    let wait = cfg.strategy_wait();
    UiTarget::new(
        "DMS report button",
        vec![
            SelectorStrategy::structural(r#"//*[local-name()="svg" and @data-testid="FaceIcon"]/.."#)
                .waiting(wait),
            SelectorStrategy::structural(r#"//*[@id="root"]/div/div[2]/div[1]/div/button[2]"#)
                .waiting(wait),
            SelectorStrategy::text("button", cfg.category_label.clone()).waiting(wait),
            SelectorStrategy::script_with(CLICK_BUTTON_BY_TEXT, cfg.category_label.clone()),
        ],
    )
}

pub fn alert_type_dropdown() -> UiTarget {
    UiTarget::new(
        "alert type dropdown",
        vec![SelectorStrategy::structural(format!(
            "{FILTER_PANEL}//tr[2]//td[2]//div/div"
        ))],
    )
}

pub fn alert_option(label: &str) -> UiTarget {
    UiTarget::new(
        format!("alert option {label}"),
        vec![SelectorStrategy::structural(format!(
            "//div[contains(text(), {})]",
            xpath_literal(label)
        ))],
    )
}

pub fn start_time_input() -> UiTarget {
    UiTarget::new(
        "start time",
        vec![SelectorStrategy::structural(format!(
            "{FILTER_PANEL}//tr[3]//td[2]//input"
        ))],
    )
}

pub fn end_time_input() -> UiTarget {
    UiTarget::new(
        "end time",
        vec![SelectorStrategy::structural(format!(
            "{FILTER_PANEL}//tr[3]//td[4]//input"
        ))],
    )
}

pub fn save_button(cfg: &ReportConfig) -> UiTarget {
    UiTarget::new(
        "save button",
        vec![
            SelectorStrategy::direct(
                "#root > div > div.MuiBox-root.css-jbmhbb > div.ant-card.ant-card-bordered.css-y8x9xp > div.ant-card-body > div > div > div > ul > li > div > div > div > div > button",
            )
            .waiting(cfg.strategy_wait()),
            SelectorStrategy::structural(
                r#"//*[@id="root"]/div/div[1]/div[2]/div[2]/div/div/div/ul/li/div/div/div/div/button/svg | //*[@data-testid="SaveOutlinedIcon"]"#,
            )
            .waiting(cfg.save_wait()),
        ],
    )
}
