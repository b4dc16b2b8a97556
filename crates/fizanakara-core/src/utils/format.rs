use std::cmp::Ordering;

use chrono::Datelike;

use crate::validation::parse_date;

const MONTHS_FR: [&str; 12] = [
    "janvier", "février", "mars", "avril", "mai", "juin", "juillet", "août", "septembre",
    "octobre", "novembre", "décembre",
];

/// Format a Malagasy phone number for display
/// Ten digit numbers become `0XX XX XX XXX`; anything else is returned as given
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => format!(
            "0{} {} {} {}",
            &digits[1..3],
            &digits[3..5],
            &digits[5..7],
            &digits[7..10]
        ),
        _ => phone.to_string(),
    }
}

/// Registry sequence number, e.g. `MBR-000042`
pub fn format_sequence_number(number: i64, prefix: &str) -> String {
    format!("{}-{:06}", prefix, number)
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Long French date, e.g. `10 mai 2024`. Unparseable input is returned as given.
pub fn format_date(date: &str) -> String {
    match parse_date(date) {
        Some(d) => format!("{} {} {}", d.day(), MONTHS_FR[d.month0() as usize], d.year()),
        None => date.to_string(),
    }
}

/// Ariary amount with French digit grouping, e.g. `1 250 000 Ar`
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    if rounded < 0 {
        format!("-{} Ar", grouped)
    } else {
        format!("{} Ar", grouped)
    }
}

/// Capitalize the first letter of each space-separated word
pub fn title_case(text: &str) -> String {
    text.to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
