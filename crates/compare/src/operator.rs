//! Operator-site interface: canonical route links, scraped timetables and
//! the fixed stop corrections applied before any comparison.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{OPERATOR_DOMAIN, STOP_REF_LEN};
use crate::stop::StopRecord;

const MODE_ARG: &str = "wtp_md";
const LINE_ARG: &str = "wtp_ln";
const DIRECTION_ARG: &str = "wtp_dr";
const VARIANT_ARG: &str = "wtp_vr";

/// Mode argument value for the bus/tram timetable pages.
const BUS_TRAM_MODE: &str = "3";

/// Canonical operator route link: one (line, direction, variant) timetable
/// page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OperatorLink {
    pub line: String,
    pub direction: String,
    pub variant: String,
}

impl OperatorLink {
    pub fn new(
        line: impl Into<String>,
        direction: impl Into<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            line: line.into(),
            direction: direction.into(),
            variant: variant.into(),
        }
    }

    /// Canonical URL of this timetable page.
    pub fn url(&self) -> String {
        format!(
            "https://www.{OPERATOR_DOMAIN}/rozklady-jazdy/\
             ?{MODE_ARG}={BUS_TRAM_MODE}&{LINE_ARG}={}&{DIRECTION_ARG}={}&{VARIANT_ARG}={}",
            self.line, self.direction, self.variant
        )
    }

    /// Parse a timetable URL.
    ///
    /// Links without the bus/tram mode or a line argument are not route
    /// links. A missing direction defaults to `"A"` and a missing variant
    /// to `"0"`; the site omits both on main-variant pages.
    pub fn parse(url: &str) -> Option<Self> {
        let args = query_params(url);
        if args.get(MODE_ARG).map(String::as_str) != Some(BUS_TRAM_MODE) {
            return None;
        }
        Some(Self {
            line: args.get(LINE_ARG)?.clone(),
            direction: args
                .get(DIRECTION_ARG)
                .cloned()
                .unwrap_or_else(|| "A".to_string()),
            variant: args
                .get(VARIANT_ARG)
                .cloned()
                .unwrap_or_else(|| "0".to_string()),
        })
    }
}

/// First value of each query argument of `url`.
fn query_params(url: &str) -> HashMap<String, String> {
    let Some((_, query)) = url.split_once('?') else {
        return HashMap::new();
    };
    let query = query.split('#').next().unwrap_or(query);
    let mut args = HashMap::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        args.entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
    args
}

/// One operator stop with its per-stop timetable flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStop {
    pub record: StopRecord,
    #[serde(default)]
    pub detour: bool,
    #[serde(default)]
    pub new: bool,
}

impl OperatorStop {
    pub fn new(record: StopRecord) -> Self {
        Self {
            record,
            detour: false,
            new: false,
        }
    }
}

/// Scraped content of one timetable page.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorTimetable {
    /// The page reported no timetable for this line/direction/variant.
    pub unavailable: bool,
    pub detour: bool,
    pub new: bool,
    pub short: bool,
    pub stops: Vec<OperatorStop>,
    /// Other route links discovered on the page, for cross-link auditing.
    #[serde(default)]
    pub seen_links: Vec<OperatorLink>,
}

/// Failure of the scraping collaborator for one link.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("fetch failed for {link}: {reason}")]
    Fetch { link: String, reason: String },
    #[error("parse failed for {link}: {reason}")]
    Parse { link: String, reason: String },
}

/// Scraping collaborator: turns a canonical link into a timetable.
///
/// Implementations live outside this crate (HTTP, HTML parsing, caching);
/// they complete or fail before returning, no retries happen here.
pub trait TimetableSource {
    fn fetch(&self, link: &OperatorLink) -> Result<OperatorTimetable, SourceError>;
}

/// Known-wrong operator (ref, name) pairs and their corrections.
///
/// Values are terminal: applying the mapping to an already corrected pair is
/// a no-op.
const STOP_FIXES: &[((&str, &str), (&str, &str))] = &[
    (("512002", "Kolejowa 02"), ("512052", "Kolejowa 52")),
    // lines 120, 314, N14
    (("129301", "Kobiałka-Szkoła 01"), ("129351", "Kobiałka-Szkoła 51")),
    // lines 116, 161, 164, 519, 522, N31, N81
    (("304202", "Sobieskiego 02"), ("304252", "Sobieskiego 52")),
    (("304203", "Sobieskiego 03"), ("304253", "Sobieskiego 53")),
    (("304204", "Sobieskiego 04"), ("304254", "Sobieskiego 54")),
    (("303001", "Tor Stegny 01"), ("303051", "Tor Stegny 51")),
    (("303002", "Tor Stegny 02"), ("303052", "Tor Stegny 52")),
    (("703702", "pl.Na Rozdrożu 02"), ("703752", "Pl. Na Rozdrożu 52")),
];

/// Correct an operator stop before it enters any comparison.
///
/// Explicit fixes win; otherwise identifiers of the shape `xxxx8x` map to
/// `xxxx0x`, together with the name's second-to-last character.
pub fn remap_operator_stop(stop: StopRecord) -> StopRecord {
    for ((from_ref, from_name), (to_ref, to_name)) in STOP_FIXES {
        if stop.stop_ref.as_str() == *from_ref && stop.name == *from_name {
            return StopRecord::new(*to_ref, *to_name);
        }
    }
    let ref_chars: Vec<char> = stop.stop_ref.as_str().chars().collect();
    if ref_chars.len() == STOP_REF_LEN && ref_chars[STOP_REF_LEN - 2] == '8' {
        let mut fixed_ref = ref_chars;
        fixed_ref[STOP_REF_LEN - 2] = '0';
        return StopRecord::new(
            fixed_ref.into_iter().collect::<String>(),
            replace_second_to_last(&stop.name, '0'),
        );
    }
    stop
}

fn replace_second_to_last(name: &str, replacement: char) -> String {
    let mut chars: Vec<char> = name.chars().collect();
    let len = chars.len();
    if len >= 2 {
        chars[len - 2] = replacement;
    }
    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_link() {
        let link = OperatorLink::parse(
            "https://www.wtp.waw.pl/rozklady-jazdy/?wtp_md=3&wtp_ln=180&wtp_dr=B&wtp_vr=2",
        )
        .unwrap();
        assert_eq!(link, OperatorLink::new("180", "B", "2"));
    }

    #[test]
    fn test_parse_applies_defaults() {
        let link =
            OperatorLink::parse("https://www.wtp.waw.pl/rozklady-jazdy/?wtp_md=3&wtp_ln=N14")
                .unwrap();
        assert_eq!(link, OperatorLink::new("N14", "A", "0"));
    }

    #[test]
    fn test_parse_rejects_other_modes() {
        assert!(
            OperatorLink::parse("https://www.wtp.waw.pl/rozklady-jazdy/?wtp_md=4&wtp_ln=S1")
                .is_none()
        );
        assert!(OperatorLink::parse("https://www.wtp.waw.pl/rozklady-jazdy/").is_none());
    }

    #[test]
    fn test_url_round_trips() {
        let link = OperatorLink::new("520", "B", "1");
        assert_eq!(OperatorLink::parse(&link.url()), Some(link));
    }

    #[test]
    fn test_remap_eighties_rule() {
        let mapped = remap_operator_stop(StopRecord::new("100081", "Test 81"));
        assert_eq!(mapped, StopRecord::new("100001", "Test 01"));
    }

    #[test]
    fn test_remap_leaves_regular_stops_alone() {
        let stop = StopRecord::new("290900", "Warszawa Falenica");
        assert_eq!(remap_operator_stop(stop.clone()), stop);
    }

    #[test]
    fn test_remap_explicit_fix() {
        let mapped = remap_operator_stop(StopRecord::new("512002", "Kolejowa 02"));
        assert_eq!(mapped, StopRecord::new("512052", "Kolejowa 52"));
    }

    #[test]
    fn test_remap_values_are_terminal() {
        for (_, (to_ref, to_name)) in STOP_FIXES {
            let value = StopRecord::new(*to_ref, *to_name);
            assert_eq!(remap_operator_stop(value.clone()), value);
        }
    }
}
