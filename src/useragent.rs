//! Device / browser classification of raw User-Agent strings.

use woothee::parser::Parser;

pub const UNKNOWN_DEVICE: &str = "Unknown";
pub const OTHER_BROWSER: &str = "Other";

/// Coarse client description stored with every click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub device: String,
    pub browser: String,
}

/// Turns a User-Agent string into a [`ClientInfo`].
///
/// Must be deterministic and must never fail: anything it cannot make sense
/// of maps to [`UNKNOWN_DEVICE`] / [`OTHER_BROWSER`].
pub trait UserAgentClassifier: Send + Sync {
    fn classify(&self, user_agent: &str) -> ClientInfo;
}

/// Default classifier built on woothee.
#[derive(Debug, Default, Clone, Copy)]
pub struct WootheeClassifier;

impl UserAgentClassifier for WootheeClassifier {
    fn classify(&self, user_agent: &str) -> ClientInfo {
        if user_agent.trim().is_empty() {
            return ClientInfo {
                device: UNKNOWN_DEVICE.to_owned(),
                browser: OTHER_BROWSER.to_owned(),
            };
        }

        let parser = Parser::new();
        let (category, name) = match parser.parse(user_agent) {
            Some(result) => (result.category, result.name),
            None => ("", ""),
        };

        let device = match category {
            "pc" => "Desktop",
            "smartphone" | "mobilephone" => "Mobile",
            "crawler" => "Bot",
            "appliance" => "Appliance",
            _ => UNKNOWN_DEVICE,
        };

        let browser = if name.is_empty() || name == "UNKNOWN" {
            browser_from_tokens(user_agent).unwrap_or(OTHER_BROWSER)
        } else {
            name
        };

        ClientInfo {
            device: device.to_owned(),
            browser: browser.to_owned(),
        }
    }
}

/// Product tokens checked, in order, when woothee has no answer. Chromium
/// forks carry `Chrome/` and everything WebKit carries `Safari/`, so the
/// more specific tokens come first.
const BROWSER_TOKENS: &[(&str, &str)] = &[
    ("Edg/", "Edge"),
    ("Edge/", "Edge"),
    ("OPR/", "Opera"),
    ("Opera/", "Opera"),
    ("Firefox/", "Firefox"),
    ("FxiOS/", "Firefox"),
    ("CriOS/", "Chrome"),
    ("Chrome/", "Chrome"),
    ("Safari/", "Safari"),
];

fn browser_from_tokens(user_agent: &str) -> Option<&'static str> {
    BROWSER_TOKENS
        .iter()
        .find(|(token, _)| user_agent.contains(token))
        .map(|&(_, browser)| browser)
}
