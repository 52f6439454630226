//! Minecraft server log classifier.
//!
//! Turns a single line of `latest.log` into at most one [`Event`]. Only lines
//! written by the server thread at INFO level are considered:
//!
//! ```text
//! [12:34:56] [Server thread/INFO]: Steve joined the game
//! [12:35:10] [Server thread/INFO]: Steve was slain by Zombie
//! [12:36:02] [Server thread/INFO]: Steve left the game
//! ```
//!
//! # Matching Policy
//!
//! | Shape | Event |
//! |-------|-------|
//! | `<name> joined the game` | [`Event::Join`] |
//! | `<name> left the game` | [`Event::Leave`] |
//! | any entry of [`DEATH_SHAPES`] | [`Event::Death`] |
//!
//! Join and leave are checked first, then the death shapes in table order.
//! The first shape that matches wins. Every shape is anchored at the end of
//! the line. Lines matching nothing produce no event; this is the common case
//! and is not an error.
//!
//! Classification is pure: the same line always yields the same result and
//! the compiled patterns are shared, immutable statics.

use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::types::Event;

/// Prefix every classified line must carry before the player name.
const SERVER_THREAD_MARKER: &str = r"\[Server thread/INFO\]: ";

/// Death phrasings in match order, as `(label, cause pattern)`.
///
/// The cause pattern is matched directly after the player name and is
/// captured as the event's cause text. Generic `was`/`tried to`/`died`
/// phrasings come first since most vanilla death messages use them.
pub const DEATH_SHAPES: &[(&str, &str)] = &[
    ("was", r"was .+"),
    ("tried_to", r"tried to .+"),
    ("died", r"died(?: .+)?"),
    ("fell", r"fell .+"),
    ("drowned", r"drowned(?: .+)?"),
    ("burned", r"burned .+"),
    ("blew_up", r"blew up"),
    ("went_up_in_flames", r"went up in flames(?: .+)?"),
    ("walked_into", r"walked into .+"),
    ("suffocated", r"suffocated .+"),
    ("withered", r"withered away(?: .+)?"),
    ("hit_the_ground", r"hit the ground too hard(?: .+)?"),
    ("starved", r"starved to death(?: .+)?"),
    ("froze", r"froze to death(?: .+)?"),
    ("kinetic_energy", r"experienced kinetic energy(?: .+)?"),
    ("floor_was_lava", r"discovered the floor was lava"),
    ("went_off_with_a_bang", r"went off with a bang(?: .+)?"),
    ("did_not_want_to_live", r"didn't want to live .+"),
];

static JOIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{SERVER_THREAD_MARKER}(\w+) joined the game$"))
        .expect("join pattern is valid")
});

static LEAVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{SERVER_THREAD_MARKER}(\w+) left the game$"))
        .expect("leave pattern is valid")
});

static DEATH_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    DEATH_SHAPES
        .iter()
        .map(|(label, cause)| {
            let regex = Regex::new(&format!(r"{SERVER_THREAD_MARKER}(\w+) ({cause})$"))
                .expect("death pattern is valid");
            (*label, regex)
        })
        .collect()
});

/// Classifies one log line into at most one event.
///
/// Trailing whitespace (including a stray `\r`) is ignored.
///
/// # Example
///
/// ```
/// use void_monitor::parser::classify;
/// use void_monitor::types::Event;
///
/// let event = classify("[10:00:00] [Server thread/INFO]: Steve drowned");
/// assert_eq!(
///     event,
///     Some(Event::Death {
///         player: "Steve".to_string(),
///         cause: "drowned".to_string(),
///     })
/// );
/// assert_eq!(classify("[10:00:01] [Server thread/INFO]: Done (3.2s)!"), None);
/// ```
#[must_use]
pub fn classify(line: &str) -> Option<Event> {
    let line = line.trim_end();

    if let Some(caps) = JOIN_PATTERN.captures(line) {
        return Some(Event::Join {
            player: caps[1].to_string(),
        });
    }

    if let Some(caps) = LEAVE_PATTERN.captures(line) {
        return Some(Event::Leave {
            player: caps[1].to_string(),
        });
    }

    death_shape(line).map(|(shape, player, cause)| {
        trace!(shape, player = %player, "Matched death shape");
        Event::Death { player, cause }
    })
}

/// Returns the label of the first death shape matching `line`, with the
/// captured player and cause.
fn death_shape(line: &str) -> Option<(&'static str, String, String)> {
    DEATH_PATTERNS.iter().find_map(|(label, regex)| {
        regex
            .captures(line)
            .map(|caps| (*label, caps[1].to_string(), caps[2].to_string()))
    })
}
