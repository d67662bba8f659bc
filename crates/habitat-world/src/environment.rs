//! Surface illumination by local time of sol.
//!
//! Each settlement sits at a longitude expressed as a time offset in
//! millisols. Local time is the pulse's millisol of sol plus that offset,
//! wrapped into one sol.
//!
//! | Local millisol        | Illumination |
//! |-----------------------|--------------|
//! | `250..=750`           | Daylight     |
//! | `200..250`, `750..800`| Twilight     |
//! | otherwise             | Dark         |
//!
//! Twilight is not bright enough for surface work, but it is not darkness
//! either: a crew too unfit to work at twilight cannot blame the dark, and
//! its site work counts as cut short.

use habitat_types::{Illumination, MILLISOLS_PER_SOL};

/// Start of daylight (inclusive), local millisols.
pub const DAWN: f64 = 250.0;
/// End of daylight (inclusive), local millisols.
pub const DUSK: f64 = 750.0;
/// Width of the twilight band on either side of daylight.
pub const TWILIGHT_WIDTH: f64 = 50.0;

/// Local time at a settlement with `offset` millisols of longitude.
pub fn local_millisol(millisol_of_sol: f64, offset: f64) -> f64 {
    (millisol_of_sol + offset).rem_euclid(MILLISOLS_PER_SOL)
}

/// Illumination at the given global millisol of sol and offset.
pub fn illumination(millisol_of_sol: f64, offset: f64) -> Illumination {
    let local = local_millisol(millisol_of_sol, offset);
    if (DAWN..=DUSK).contains(&local) {
        Illumination::Daylight
    } else if (DAWN - TWILIGHT_WIDTH..DAWN).contains(&local)
        || (DUSK..DUSK + TWILIGHT_WIDTH).contains(&local)
    {
        Illumination::Twilight
    } else {
        Illumination::Dark
    }
}
