//! Time-derived generators
//!
//! All of these are pure functions of the instant they are given.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc};

const TIME_FORMAT: &str = "%H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Two-letter weekday names, Monday first
const WEEKDAYS: [&str; 7] = ["Mo", "Di", "Mi", "Do", "Fr", "Sa", "So"];

const MILLIS_PER_DAY: u64 = 24 * 60 * 60 * 1000;
const CENTIBEATS_PER_DAY: u64 = 100_000;

/// Rainbow: seconds per color segment
const RAINBOW_SEGMENT: u32 = 10;
/// Rainbow: largest channel change between two consecutive seconds
const RAINBOW_MAX_STEP: u32 = (255 + RAINBOW_SEGMENT - 1) / RAINBOW_SEGMENT;
/// Rainbow: seconds per full sweep
pub const RAINBOW_PERIOD: u32 = 6 * RAINBOW_SEGMENT;

pub fn seconds_since_midnight(now: &DateTime<FixedOffset>) -> u32 {
    now.num_seconds_from_midnight()
}

/// ISO-8601 week number, zero-padded to two digits
pub fn calendar_week(now: &DateTime<FixedOffset>) -> String {
    format!("{:02}", now.iso_week().week())
}

pub fn weekday(now: &DateTime<FixedOffset>) -> String {
    WEEKDAYS[now.weekday().num_days_from_monday() as usize].to_string()
}

pub fn local_time(now: &DateTime<FixedOffset>) -> String {
    now.format(TIME_FORMAT).to_string()
}

pub fn utc_time(now: &DateTime<FixedOffset>) -> String {
    now.with_timezone(&Utc).format(TIME_FORMAT).to_string()
}

pub fn date(now: &DateTime<FixedOffset>) -> String {
    now.format(DATE_FORMAT).to_string()
}

/// Internet time: the UTC+1 day split into 1000 beats, two decimals
pub fn swatch_time(now: &DateTime<FixedOffset>) -> String {
    let biel = now.with_timezone(&Utc) + Duration::hours(1);
    let millis = u64::from(biel.num_seconds_from_midnight()) * 1000
        + u64::from(biel.nanosecond().min(999_999_999) / 1_000_000);

    // round half up to a hundredth of a beat
    let half = MILLIS_PER_DAY / 2;
    let centibeats = ((millis * CENTIBEATS_PER_DAY + half) / MILLIS_PER_DAY) % CENTIBEATS_PER_DAY;

    format!("{:03}.{:02}", centibeats / 100, centibeats % 100)
}

/// Entry of `lines` shown at `now`; every entry stays for two seconds
pub fn about(now: &DateTime<FixedOffset>, lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let slot = seconds_since_midnight(now) as usize % (lines.len() * 2);
    lines[slot / 2].clone()
}

/// `#RRGGBB` color cycling red, yellow, green, cyan, blue, magenta
pub fn rainbow(now: &DateTime<FixedOffset>) -> String {
    rainbow_at(seconds_since_midnight(now))
}

pub fn rainbow_at(seconds: u32) -> String {
    let (r, g, b) = rainbow_rgb(seconds);
    format!("#{r:02X}{g:02X}{b:02X}")
}

fn rainbow_rgb(seconds: u32) -> (u32, u32, u32) {
    let v = seconds % RAINBOW_PERIOD;
    let segment = v / RAINBOW_SEGMENT;
    let up = (v % RAINBOW_SEGMENT) * 255 / RAINBOW_SEGMENT;
    let down = 255 - up;

    match segment {
        0 => (255, up, 0),
        1 => (down, 255, 0),
        2 => (0, 255, up),
        3 => (0, down, 255),
        4 => (up, 0, 255),
        _ => (255, 0, down),
    }
}
