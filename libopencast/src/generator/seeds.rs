//! Content seeds
//!
//! A seed pairs a writing tone with a content style and optional framing.
//! One seed is drawn per attempt and appended to the rendered prompt, so
//! retries for the same topic tend to produce different text.

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WritingTone {
    Professional,
    Casual,
    Enthusiastic,
    Analytical,
    Practical,
    Inspirational,
    Direct,
    Conversational,
    Expert,
    BeginnerFriendly,
}

impl WritingTone {
    pub fn as_str(&self) -> &'static str {
        match self {
            WritingTone::Professional => "professional",
            WritingTone::Casual => "casual",
            WritingTone::Enthusiastic => "enthusiastic",
            WritingTone::Analytical => "analytical",
            WritingTone::Practical => "practical",
            WritingTone::Inspirational => "inspirational",
            WritingTone::Direct => "direct",
            WritingTone::Conversational => "conversational",
            WritingTone::Expert => "expert",
            WritingTone::BeginnerFriendly => "beginner_friendly",
        }
    }
}

impl fmt::Display for WritingTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentStyle {
    Tip,
    Warning,
    BestPractice,
    CommonMistake,
    QuickWin,
    DeepInsight,
    Comparison,
    StepByStep,
    Question,
    Fact,
}

impl ContentStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStyle::Tip => "tip",
            ContentStyle::Warning => "warning",
            ContentStyle::BestPractice => "best_practice",
            ContentStyle::CommonMistake => "common_mistake",
            ContentStyle::QuickWin => "quick_win",
            ContentStyle::DeepInsight => "deep_insight",
            ContentStyle::Comparison => "comparison",
            ContentStyle::StepByStep => "step_by_step",
            ContentStyle::Question => "question",
            ContentStyle::Fact => "fact",
        }
    }
}

impl fmt::Display for ContentStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSeed {
    pub tone: WritingTone,
    pub style: ContentStyle,
    pub prefix: Option<&'static str>,
    pub approach: &'static str,
    pub length_preference: &'static str,
}

impl ContentSeed {
    const fn new(tone: WritingTone, style: ContentStyle, approach: &'static str) -> Self {
        Self {
            tone,
            style,
            prefix: None,
            approach,
            length_preference: "medium",
        }
    }

    const fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Append the seed's tone and framing instructions to a prompt
    pub fn apply_to_prompt(&self, prompt: &str) -> String {
        let mut enhanced = format!(
            "{}\n\nWriting tone: {}\nContent style: {}\n",
            prompt, self.tone, self.style
        );
        if !self.approach.is_empty() {
            enhanced.push_str(&format!("Approach: {}\n", self.approach));
        }
        if let Some(prefix) = self.prefix {
            enhanced.push_str(&format!("Start with: {}\n", prefix));
        }
        enhanced.push_str(&format!("Length preference: {}", self.length_preference));
        enhanced
    }
}

use ContentStyle as S;
use WritingTone as T;

pub const SEEDS: &[ContentSeed] = &[
    ContentSeed::new(T::Professional, S::Tip, "Focus on industry best practices and proven methods"),
    ContentSeed::new(T::Professional, S::BestPractice, "Emphasize standards and methodologies"),
    ContentSeed::new(T::Analytical, S::DeepInsight, "Provide technical depth and reasoning"),
    ContentSeed::new(T::Practical, S::QuickWin, "Focus on immediate actionable benefits").with_prefix("Pro tip:"),
    ContentSeed::new(T::Direct, S::StepByStep, "Give clear, concise instructions"),
    ContentSeed::new(T::Practical, S::CommonMistake, "Highlight what not to do and why").with_prefix("Avoid this:"),
    ContentSeed::new(T::Enthusiastic, S::Tip, "Show excitement about the benefits").with_prefix("Game changer:"),
    ContentSeed::new(T::Conversational, S::Question, "Start with a thought-provoking question"),
    ContentSeed::new(T::Inspirational, S::BestPractice, "Motivate and encourage adoption"),
    ContentSeed::new(T::Expert, S::DeepInsight, "Share advanced knowledge and experience"),
    ContentSeed::new(T::Expert, S::Comparison, "Compare different approaches or tools"),
    ContentSeed::new(T::Analytical, S::Fact, "Present data-driven insights"),
    ContentSeed::new(T::BeginnerFriendly, S::Tip, "Explain concepts simply and clearly").with_prefix("New to this?"),
    ContentSeed::new(T::BeginnerFriendly, S::StepByStep, "Break down complex topics into simple steps"),
    ContentSeed::new(T::Direct, S::Warning, "Highlight critical considerations").with_prefix("Important:"),
    ContentSeed::new(T::Professional, S::Warning, "Emphasize key points to avoid issues").with_prefix("Remember:"),
    ContentSeed::new(T::Casual, S::Tip, "Use friendly, approachable language"),
    ContentSeed::new(T::Conversational, S::QuickWin, "Share helpful shortcuts or tricks").with_prefix("Quick tip:"),
];

pub fn random_seed<R: Rng + ?Sized>(rng: &mut R) -> &'static ContentSeed {
    // SEEDS is a non-empty constant
    SEEDS.choose(rng).unwrap_or(&SEEDS[0])
}
