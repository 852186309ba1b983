// huntwarden/src/world.rs
//
// World builder: deterministic hunt locations per theme.
//
// The location name is picked from a per-theme catalog by a stable md5 of
// (theme, difficulty), so the same request always yields the same place. The
// challenge list grows with difficulty (1..=10, clamped).

use serde::{Deserialize, Serialize};

const CATALOG: &[(&str, &[&str])] = &[
    ("jungle",   &["Ancient ruins hidden in the jungle", "Vine-covered temple steps", "Waterfall cave behind the mist"]),
    ("pirate",   &["Smugglers' cove at low tide", "Wreck of the Black Gull", "Lighthouse on the rocky point"]),
    ("desert",   &["Buried oasis shrine", "Wind-carved canyon maze", "Caravan stop beneath the dunes"]),
    ("urban",    &["Forgotten subway platform", "Clock tower attic", "Rooftop garden above the square"]),
    ("medieval", &["Crumbling castle keep", "Monastery library vault", "Knight's tomb in the old chapel"]),
    ("space",    &["Abandoned observatory dome", "Crashed satellite field", "Launch pad control bunker"]),
];

const GENERIC: &[&str] = &["Old stone bridge over the river", "Hilltop lookout", "Overgrown town garden"];

/// Ordered from easiest to hardest; difficulty d unlocks the first
/// `1 + d / 2` entries (1..=6).
const CHALLENGES: &[&str] = &[
    "Find the hidden entrance",
    "Solve the stone puzzle",
    "Decode the carved inscription",
    "Follow the shadow at noon",
    "Cross the trapped corridor in order",
    "Answer the guardian's final riddle",
];

#[derive(Debug, Clone, Deserialize)]
pub struct LocationRequest {
    pub theme:      String,
    pub difficulty: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedLocation {
    pub location:   String,
    pub theme:      String,
    pub challenges: Vec<String>,
    pub difficulty: u8,
}

pub fn generate_location(req: &LocationRequest) -> GeneratedLocation {
    let difficulty = req.difficulty.clamp(1, 10) as u8;
    let theme = req.theme.trim().to_lowercase();
    let names = CATALOG.iter()
        .find(|(t, _)| theme.contains(t))
        .map(|(_, names)| *names)
        .unwrap_or(GENERIC);

    let digest = md5::compute(format!("{}:{}", theme, difficulty));
    let location = names[digest[0] as usize % names.len()].to_string();

    let n = (1 + difficulty as usize / 2).min(CHALLENGES.len());
    GeneratedLocation {
        location,
        theme,
        challenges: CHALLENGES[..n].iter().map(|c| c.to_string()).collect(),
        difficulty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(theme: &str, difficulty: i64) -> LocationRequest {
        LocationRequest { theme: theme.into(), difficulty }
    }

    #[test]
    fn same_request_same_location() {
        assert_eq!(generate_location(&req("Jungle", 4)), generate_location(&req("jungle", 4)));
    }

    #[test]
    fn theme_catalog_is_used() {
        let loc = generate_location(&req("pirate adventure", 3));
        assert!(CATALOG[1].1.contains(&loc.location.as_str()));
        let other = generate_location(&req("cooking", 3));
        assert!(GENERIC.contains(&other.location.as_str()));
    }

    #[test]
    fn difficulty_is_clamped_and_scales_challenges() {
        let easy = generate_location(&req("desert", -3));
        assert_eq!(easy.difficulty, 1);
        assert_eq!(easy.challenges, vec!["Find the hidden entrance"]);

        let hard = generate_location(&req("desert", 99));
        assert_eq!(hard.difficulty, 10);
        assert_eq!(hard.challenges.len(), CHALLENGES.len());
    }
}
