// huntwarden/src/clue/prompt.rs
//
// Prompt templates. Each builder interpolates request fields into a fixed
// template; nothing here talks to a provider.

use crate::clue::types::{ClueLocation, ClueType, LocationAnalysis, PlayerProfile, PreviousClue};

pub const CLUE_SYSTEM: &str = "You are a creative treasure hunt clue generator.";
pub const PUZZLE_SYSTEM: &str = "You design fair, solvable outdoor puzzles for treasure hunts.";
pub const NARRATIVE_SYSTEM: &str = "You write short, atmospheric treasure hunt story chapters.";

const HISTORY_EXCERPT: usize = 200;

pub struct ClueContext<'a> {
    pub theme:          &'a str,
    pub difficulty:     &'a str,
    pub previous_clues: &'a [PreviousClue],
    pub max_length:     usize,
}

pub fn clue_prompt(
    clue_type: ClueType,
    loc:       &ClueLocation,
    analysis:  &LocationAnalysis,
    player:    &PlayerProfile,
    ctx:       &ClueContext<'_>,
) -> String {
    let landmarks = analysis.landmarks.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
    format!(
        "Generate a {clue_type} clue for a treasure hunt with these constraints:\n\
         \n\
         LOCATION CONTEXT:\n\
         - Place: {place}\n\
         - Landmarks: {landmarks}\n\
         - Historical significance: {history}\n\
         - Cultural context: {culture}\n\
         \n\
         PLAYER PROFILE:\n\
         - Level: {level}\n\
         - Success rate: {success}%\n\
         - Learning style: {style}\n\
         - Cultural background: {player_culture}\n\
         \n\
         HUNT CONTEXT:\n\
         - Theme: {theme}\n\
         - Difficulty: {difficulty}\n\
         - Previous clues solved: {solved}\n\
         {previous}\n\
         \n\
         REQUIREMENTS:\n\
         - Difficulty appropriate for level {level}\n\
         - Incorporate local context naturally\n\
         - Lead to physical exploration\n\
         - Cultural sensitivity\n\
         - At most {max_len} characters\n\
         \n\
         Generate a {clue_type} that makes the player explore {place}:",
        place          = loc.display_name(),
        history        = excerpt(&analysis.historical_significance, HISTORY_EXCERPT),
        culture        = analysis.cultural_elements,
        level          = player.level,
        success        = (player.success_rate * 100.0).round() as i64,
        style          = player.learning_style,
        player_culture = player.cultural_context,
        theme          = ctx.theme,
        difficulty     = ctx.difficulty,
        solved         = ctx.previous_clues.len(),
        previous       = previous_clues(ctx.previous_clues),
        max_len        = ctx.max_length,
    )
}

pub fn puzzle_prompt(puzzle_type: &str, complexity: &str, theme: &str, loc: &ClueLocation) -> String {
    format!(
        "Design a {puzzle_type} puzzle for a treasure hunt.\n\
         \n\
         PARAMETERS:\n\
         - Complexity: {complexity}\n\
         - Theme: {theme}\n\
         {location}\n\
         \n\
         PUZZLE REQUIREMENTS:\n\
         - Must be solvable within 5-15 minutes\n\
         - Should involve some physical exploration\n\
         - Should tell a small part of the overall story\n\
         \n\
         Create an engaging puzzle:",
        location = location_context(loc),
    )
}

pub fn chapter_prompt(theme: &str, chapter: usize, total: usize, stage: &str, location: &str, previous: &[String]) -> String {
    let events = if previous.is_empty() {
        "This is the beginning of the adventure.".to_string()
    } else {
        let start = previous.len().saturating_sub(5);
        previous[start..].join(", ")
    };
    format!(
        "Develop a narrative segment for a treasure hunt.\n\
         \n\
         STORY CONTEXT:\n\
         - Overall Theme: {theme}\n\
         - Chapter: {chapter} of {total} ({stage})\n\
         - Setting: {location}\n\
         - Previous Events: {events}\n\
         \n\
         Write the chapter in at most three sentences:",
    )
}

pub fn difficulty_prompt(
    level:        u32,
    success_rate: f64,
    solving_time: f64,
    trend:        &str,
    current:      f64,
    context:      &str,
) -> String {
    format!(
        "Analyze this game scenario and suggest difficulty adjustments:\n\
         \n\
         PLAYER PERFORMANCE:\n\
         - Current Level: {level}\n\
         - Success Rate: {success}%\n\
         - Average Solving Time: {solving_time:.0} seconds\n\
         - Recent Performance: {trend}\n\
         \n\
         CURRENT DIFFICULTY: {current:.2}\n\
         GAME CONTEXT: {context}\n\
         \n\
         Suggest one difficulty adjustment in a single sentence.",
        success = (success_rate * 100.0).round() as i64,
    )
}

fn location_context(loc: &ClueLocation) -> String {
    let mut parts = Vec::new();
    if let Some(name) = &loc.name {
        parts.push(format!("- Location: {}", name));
    }
    if !loc.landmarks.is_empty() {
        parts.push(format!("- Nearby landmarks: {}", loc.landmarks.iter().take(3).cloned().collect::<Vec<_>>().join(", ")));
    }
    if let Some(history) = &loc.history {
        parts.push(format!("- Historical significance: {}", excerpt(history, HISTORY_EXCERPT)));
    }
    if !loc.features.is_empty() {
        parts.push(format!("- Notable features: {}", loc.features.iter().take(3).cloned().collect::<Vec<_>>().join(", ")));
    }
    parts.join("\n")
}

fn previous_clues(prev: &[PreviousClue]) -> String {
    if prev.is_empty() {
        return "No previous clues in this hunt.".to_string();
    }
    let start = prev.len().saturating_sub(3);
    prev[start..].iter().enumerate()
        .map(|(i, c)| format!("Clue {}: {}", i + 1, c.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max).collect::<String>() + "..."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clue_prompt_interpolates_fields() {
        let loc = ClueLocation {
            name:      Some("Old Harbour".into()),
            landmarks: vec!["lighthouse".into(), "pier".into(), "crane".into(), "dock".into()],
            ..Default::default()
        };
        let analysis = LocationAnalysis::of(&loc);
        let player = PlayerProfile::from_request(2, None);
        let prev = vec![PreviousClue { text: "Seek the gull".into() }];
        let ctx = ClueContext { theme: "pirates", difficulty: "easy", previous_clues: &prev, max_length: 120 };

        let p = clue_prompt(ClueType::Riddle, &loc, &analysis, &player, &ctx);
        assert!(p.starts_with("Generate a riddle clue"));
        assert!(p.contains("- Landmarks: lighthouse, pier, crane\n"));
        assert!(!p.contains("dock"));
        assert!(p.contains("- Success rate: 50%"));
        assert!(p.contains("Clue 1: Seek the gull"));
        assert!(p.contains("At most 120 characters"));
        assert!(p.ends_with("explore Old Harbour:"));
    }

    #[test]
    fn chapter_prompt_defaults_to_beginning() {
        let p = chapter_prompt("jungle", 1, 3, "introduction", "Temple gate", &[]);
        assert!(p.contains("Chapter: 1 of 3 (introduction)"));
        assert!(p.contains("This is the beginning of the adventure."));
    }

    #[test]
    fn long_history_is_cut() {
        let loc = ClueLocation { history: Some("x".repeat(500)), ..Default::default() };
        let p = puzzle_prompt("logical", "medium", "space", &loc);
        assert!(p.contains(&format!("{}...", "x".repeat(200))));
        assert!(!p.contains(&"x".repeat(201)));
    }
}
