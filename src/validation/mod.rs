//! Inline field sanitizers and the submit-time card validation rules.
//!
//! Sanitizers are pure functions of the raw input and never block an edit;
//! submit-time rules run in a fixed order and the engine stops at the first
//! failure, preserving the original messages.

use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

pub const MSG_CARD_LENGTH: &str = "Invalid card number. It should be between 13 and 19 digits.";
pub const MSG_CARD_DIGITS: &str = "Card number must contain only digits.";
pub const MSG_CARD_LUHN: &str = "Invalid card number. Please enter a valid card.";
pub const MSG_EXPIRY_SHAPE: &str = "Expiry must be in MM/YY format.";
pub const MSG_EXPIRY_MONTH: &str = "Invalid month.";
pub const MSG_CARD_EXPIRED: &str = "Card has expired.";
pub const MSG_EXPIRY_PAST_MONTH: &str = "Expiry month cannot be in the past.";
pub const MSG_CVV_LENGTH: &str = "CVV must be at least 3 digits.";
pub const MSG_PHONE_LENGTH: &str = "Phone number must be exactly 10 digits.";
pub const MSG_ADDRESS_REQUIRED: &str = "Shipping address is required.";

const PHONE_MAX_DIGITS: usize = 10;
const CARD_DISPLAY_MAX_DIGITS: usize = 16;
const CARD_MIN_DIGITS: usize = 13;
const CARD_MAX_DIGITS: usize = 19;
const EXPIRY_MAX_CHARS: usize = 5;
const CVV_MAX_DIGITS: usize = 4;
const CVV_MIN_DIGITS: usize = 3;

static EXPIRY_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}$").expect("expiry regex is valid"));

// ---------------------------------------------------------------------------
// Inline sanitizers (fire on every edit)
// ---------------------------------------------------------------------------

/// Keeps digits only, capped at the native phone length.
pub fn sanitize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(PHONE_MAX_DIGITS)
        .collect()
}

/// Inline annotation for the phone field: present but not exactly 10 digits.
pub fn phone_inline_error(phone: &str) -> Option<String> {
    if !phone.is_empty() && phone.len() != PHONE_MAX_DIGITS {
        Some(MSG_PHONE_LENGTH.to_string())
    } else {
        None
    }
}

/// Display transform for the card number: digits only, truncated to 16, then
/// grouped in blocks of 4 separated by single spaces. Lossy beyond 16 digits
/// even though submit-time validation accepts up to 19.
pub fn format_card_number(raw: &str) -> String {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(CARD_DISPLAY_MAX_DIGITS)
        .collect();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    grouped
}

/// Expiry mask: keeps `[0-9/]`, truncates to 5 chars and auto-appends the
/// slash once two leading digits are typed.
pub fn sanitize_expiry(raw: &str) -> String {
    let mut value: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '/')
        .take(EXPIRY_MAX_CHARS)
        .collect();
    if value.len() == 2 && !value.contains('/') {
        value.push('/');
    }
    value
}

/// CVV mask: digits only, capped at 4.
pub fn sanitize_cvv(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .take(CVV_MAX_DIGITS)
        .collect()
}

/// Strips whitespace from the display form of a card number.
pub fn strip_card_whitespace(display: &str) -> String {
    display.chars().filter(|c| !c.is_whitespace()).collect()
}

// ---------------------------------------------------------------------------
// Submit-time rules
// ---------------------------------------------------------------------------

/// Luhn checksum over a digit string: processed right-to-left, every second
/// digit doubled (minus 9 above 9), valid iff the sum is a multiple of 10.
pub fn luhn_check(digits: &str) -> bool {
    let mut sum: u32 = 0;
    let mut double = false;
    for c in digits.chars().rev() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }
    sum % 10 == 0
}

/// Card fields as seen at submit time, with the number already
/// whitespace-stripped.
#[derive(Debug, Clone, Copy)]
pub struct CardInput<'a> {
    pub number: &'a str,
    pub expiry: &'a str,
    pub cvv: &'a str,
}

/// The "today" an expiry is judged against.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryReference {
    pub year: i32,
    pub month: u32,
}

impl ExpiryReference {
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }
}

/// Outcome of a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Pass,
    Fail(String),
}

/// One ordered submit-time rule.
pub struct ValidationRule {
    pub name: &'static str,
    check: fn(&CardInput<'_>, &ExpiryReference) -> RuleOutcome,
}

fn fail(message: &str) -> RuleOutcome {
    RuleOutcome::Fail(message.to_string())
}

fn check_card_length(input: &CardInput<'_>, _: &ExpiryReference) -> RuleOutcome {
    if input.number.len() < CARD_MIN_DIGITS || input.number.len() > CARD_MAX_DIGITS {
        fail(MSG_CARD_LENGTH)
    } else {
        RuleOutcome::Pass
    }
}

fn check_card_digits(input: &CardInput<'_>, _: &ExpiryReference) -> RuleOutcome {
    if input.number.chars().all(|c| c.is_ascii_digit()) {
        RuleOutcome::Pass
    } else {
        fail(MSG_CARD_DIGITS)
    }
}

fn check_card_luhn(input: &CardInput<'_>, _: &ExpiryReference) -> RuleOutcome {
    if luhn_check(input.number) {
        RuleOutcome::Pass
    } else {
        fail(MSG_CARD_LUHN)
    }
}

fn check_expiry_shape(input: &CardInput<'_>, _: &ExpiryReference) -> RuleOutcome {
    if EXPIRY_SHAPE.is_match(input.expiry) {
        RuleOutcome::Pass
    } else {
        fail(MSG_EXPIRY_SHAPE)
    }
}

fn parse_expiry(expiry: &str) -> Option<(u32, i32)> {
    let (mm, yy) = expiry.split_once('/')?;
    let month: u32 = mm.parse().ok()?;
    let year: i32 = yy.parse().ok()?;
    // Two-digit years are anchored to the 2000s
    Some((month, 2000 + year))
}

fn check_expiry_month_range(input: &CardInput<'_>, _: &ExpiryReference) -> RuleOutcome {
    let Some((month, _)) = parse_expiry(input.expiry) else {
        return fail(MSG_EXPIRY_SHAPE);
    };
    if !(1..=12).contains(&month) {
        fail(MSG_EXPIRY_MONTH)
    } else {
        RuleOutcome::Pass
    }
}

fn check_expiry_not_past(input: &CardInput<'_>, reference: &ExpiryReference) -> RuleOutcome {
    let Some((month, year)) = parse_expiry(input.expiry) else {
        return fail(MSG_EXPIRY_SHAPE);
    };
    if year < reference.year {
        fail(MSG_CARD_EXPIRED)
    } else if year == reference.year && month < reference.month {
        fail(MSG_EXPIRY_PAST_MONTH)
    } else {
        RuleOutcome::Pass
    }
}

fn check_cvv_length(input: &CardInput<'_>, _: &ExpiryReference) -> RuleOutcome {
    if input.cvv.len() < CVV_MIN_DIGITS {
        fail(MSG_CVV_LENGTH)
    } else {
        RuleOutcome::Pass
    }
}

/// The ordered card rule set. Order matters: later rules may assume earlier
/// ones passed.
pub fn card_rules() -> &'static [ValidationRule] {
    static RULES: &[ValidationRule] = &[
        ValidationRule {
            name: "card_length",
            check: check_card_length,
        },
        ValidationRule {
            name: "card_digits",
            check: check_card_digits,
        },
        ValidationRule {
            name: "card_luhn",
            check: check_card_luhn,
        },
        ValidationRule {
            name: "expiry_shape",
            check: check_expiry_shape,
        },
        ValidationRule {
            name: "expiry_month_range",
            check: check_expiry_month_range,
        },
        ValidationRule {
            name: "expiry_not_past",
            check: check_expiry_not_past,
        },
        ValidationRule {
            name: "cvv_length",
            check: check_cvv_length,
        },
    ];
    RULES
}

/// Runs the card rules in order, returning the first failure message.
pub fn validate_card(input: &CardInput<'_>, reference: &ExpiryReference) -> Result<(), String> {
    for rule in card_rules() {
        if let RuleOutcome::Fail(message) = (rule.check)(input, reference) {
            return Err(message);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(number: &'a str, expiry: &'a str, cvv: &'a str) -> CardInput<'a> {
        CardInput { number, expiry, cvv }
    }

    fn reference() -> ExpiryReference {
        ExpiryReference {
            year: 2026,
            month: 8,
        }
    }

    #[test]
    fn test_luhn_accepts_valid_card() {
        assert!(luhn_check("4539148803436467"));
    }

    #[test]
    fn test_luhn_rejects_perturbed_last_digit() {
        assert!(!luhn_check("4539148803436468"));
    }

    #[test]
    fn test_length_boundaries() {
        // 12 digits: too short, fails before Luhn ever runs
        let err = validate_card(&input("453914880343", "12/30", "123"), &reference()).unwrap_err();
        assert_eq!(err, MSG_CARD_LENGTH);

        // 13-digit Visa test number passes both length and Luhn
        assert!(validate_card(&input("4222222222222", "12/30", "123"), &reference()).is_ok());
    }

    #[test]
    fn test_non_digit_content_fails_after_length() {
        let err = validate_card(&input("453914880343646a", "12/30", "123"), &reference())
            .unwrap_err();
        assert_eq!(err, MSG_CARD_DIGITS);
    }

    #[test]
    fn test_expiry_shape_checked_before_semantics() {
        let err =
            validate_card(&input("4539148803436467", "1/25", "123"), &reference()).unwrap_err();
        assert_eq!(err, MSG_EXPIRY_SHAPE);
    }

    #[test]
    fn test_expiry_month_out_of_range() {
        let err =
            validate_card(&input("4539148803436467", "00/30", "123"), &reference()).unwrap_err();
        assert_eq!(err, MSG_EXPIRY_MONTH);
    }

    #[test]
    fn test_expired_year() {
        let err =
            validate_card(&input("4539148803436467", "01/20", "123"), &reference()).unwrap_err();
        assert_eq!(err, MSG_CARD_EXPIRED);
    }

    #[test]
    fn test_past_month_in_current_year() {
        let err =
            validate_card(&input("4539148803436467", "07/26", "123"), &reference()).unwrap_err();
        assert_eq!(err, MSG_EXPIRY_PAST_MONTH);

        // The current month itself is still acceptable
        assert!(validate_card(&input("4539148803436467", "08/26", "123"), &reference()).is_ok());
    }

    #[test]
    fn test_cvv_too_short() {
        let err =
            validate_card(&input("4539148803436467", "12/30", "12"), &reference()).unwrap_err();
        assert_eq!(err, MSG_CVV_LENGTH);
    }

    #[test]
    fn test_card_display_grouping() {
        assert_eq!(
            format_card_number("4111111111111111"),
            "4111 1111 1111 1111"
        );
    }

    #[test]
    fn test_card_display_truncates_past_sixteen() {
        // 20 raw digits: only the first 16 survive the display transform
        assert_eq!(
            format_card_number("41111111111111112222"),
            "4111 1111 1111 1111"
        );
    }

    #[test]
    fn test_card_display_strips_noise() {
        assert_eq!(format_card_number("4111-1111 11x11"), "4111 1111 1111");
    }

    #[test]
    fn test_expiry_mask_auto_slash() {
        assert_eq!(sanitize_expiry("12"), "12/");
        assert_eq!(sanitize_expiry("12/3"), "12/3");
        assert_eq!(sanitize_expiry("12/345"), "12/34");
        assert_eq!(sanitize_expiry("ab12cd"), "12/");
    }

    #[test]
    fn test_expiry_mask_keeps_user_slash() {
        assert_eq!(sanitize_expiry("1/"), "1/");
        assert_eq!(sanitize_expiry("12/34"), "12/34");
    }

    #[test]
    fn test_phone_sanitizer_and_inline_error() {
        assert_eq!(sanitize_phone("(987) 654-3210 ext 9"), "9876543210");
        assert_eq!(phone_inline_error(""), None);
        assert_eq!(phone_inline_error("9876543210"), None);
        assert_eq!(
            phone_inline_error("98765").as_deref(),
            Some(MSG_PHONE_LENGTH)
        );
    }

    #[test]
    fn test_sanitizers_are_idempotent() {
        let phone = sanitize_phone("98-76-54-32-10");
        assert_eq!(sanitize_phone(&phone), phone);

        let card = format_card_number("4111111111111111");
        assert_eq!(format_card_number(&card), card);

        let expiry = sanitize_expiry("1230");
        assert_eq!(sanitize_expiry(&expiry), expiry);

        let cvv = sanitize_cvv("12345");
        assert_eq!(sanitize_cvv(&cvv), cvv);
    }

    #[test]
    fn test_strip_card_whitespace() {
        assert_eq!(
            strip_card_whitespace("4111 1111 1111 1111"),
            "4111111111111111"
        );
    }
}
