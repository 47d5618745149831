//! Expiry timestamps and freshness evaluation.
//!
//! Entries carry their absolute expiry as an HTTP-date in `x-tl-expires`. The
//! freshness of a cached entry is judged against that timestamp and the
//! configured stale window:
//!
//! ```text
//!            expires_at              expires_at + stale
//!  ─── Fresh ────┼──────── Stale ────────────┼──── Expired ───▶ now
//!   serve as-is     serve + refresh in bg        fetch upstream
//! ```

use chrono::{DateTime, Duration, Utc};

/// Format of an IMF-fixdate (RFC 7231), e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Freshness of a cached entry at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Before `expires_at`.
    Fresh,
    /// Past `expires_at` but inside the stale window.
    Stale,
    /// Past the stale window, or the expiry is unknown.
    Expired,
}

/// Formats a timestamp as an HTTP-date.
pub fn format_http_date(at: DateTime<Utc>) -> String {
    at.format(HTTP_DATE_FORMAT).to_string()
}

/// Parses an HTTP-date (or any RFC 2822 date) into UTC.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|at| at.with_timezone(&Utc))
}

/// Evaluates freshness of an entry expiring at `expires_at`.
///
/// An entry whose expiry could not be read is treated as expired at the epoch,
/// so it is never served.
pub fn freshness(
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    stale_secs: u64,
) -> Freshness {
    let Some(expires_at) = expires_at else {
        return Freshness::Expired;
    };

    if now < expires_at {
        return Freshness::Fresh;
    }

    // An unrepresentable window end means the window never closes.
    let stale_until = i64::try_from(stale_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|stale| expires_at.checked_add_signed(stale));

    match stale_until {
        Some(until) if now >= until => Freshness::Expired,
        _ => Freshness::Stale,
    }
}

/// Timestamp `secs` seconds after `now`, saturating at the latest representable time.
pub fn expires_after(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Whole seconds from `now` until `expires_at`, rounded up, floored at zero.
pub fn secs_until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (expires_at - now).num_milliseconds();
    if millis <= 0 {
        0
    } else {
        (millis as u64).div_ceil(1000)
    }
}
