//! Curriculum catalog and persona prompts.
//!
//! The catalog lists the models, topics and content formats offered to the
//! user. A [`LessonPlan`] holds the current selection and renders the two
//! system messages that precede every outbound request.

use std::fmt;
use std::str::FromStr;

use crate::types::Message;

/// Models offered in the model selector. Hosted entries first.
pub const MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4-turbo",
    "gpt-3.5-turbo",
    "llama3.1:8b",
    "gemma2:2b",
    "mistral-nemo:latest",
    "phi3:latest",
];

/// Selectable environmental topics
pub const ENVIRONMENTAL_TOPICS: &[&str] = &[
    "Climate Change",
    "Renewable Energy",
    "Biodiversity",
    "Waste Management",
    "Water Conservation",
    "Sustainable Agriculture",
    "Air Quality",
    "Ocean Conservation",
    "Deforestation",
    "Ecological Footprint",
];

/// Selectable educational content formats
pub const CONTENT_TYPES: &[&str] = &[
    "Fact Sheets",
    "Interactive Quizzes",
    "Case Studies",
    "Infographics",
    "Video Explanations",
    "Practical Tips",
    "Scientific Articles",
    "Debates",
];

/// Display name used until the user picks one
pub const DEFAULT_USER_NAME: &str = "Eco-Learner";

/// Default model selection
pub fn default_model() -> &'static str {
    MODELS[0]
}

/// Find a catalog topic by case-insensitive name
pub fn resolve_topic(name: &str) -> Option<&'static str> {
    resolve(ENVIRONMENTAL_TOPICS, name)
}

/// Find a catalog content type by case-insensitive name
pub fn resolve_content_type(name: &str) -> Option<&'static str> {
    resolve(CONTENT_TYPES, name)
}

fn resolve(catalog: &[&'static str], name: &str) -> Option<&'static str> {
    let name = name.trim();
    catalog
        .iter()
        .copied()
        .find(|entry| entry.eq_ignore_ascii_case(name))
}

/// Difficulty level of the generated content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Self::Beginner, Self::Intermediate, Self::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown difficulty '{}'. Expected one of: Beginner, Intermediate, Advanced",
                    s
                )
            })
    }
}

/// Current topic, format and difficulty selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonPlan {
    pub topics: Vec<String>,
    pub content_type: String,
    pub difficulty: Difficulty,
}

impl Default for LessonPlan {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            content_type: CONTENT_TYPES[0].to_string(),
            difficulty: Difficulty::default(),
        }
    }
}

impl LessonPlan {
    /// Replace the topic selection.
    ///
    /// Names are matched against [`ENVIRONMENTAL_TOPICS`]; unknown names are
    /// returned and the known ones are kept, in the order given.
    pub fn select_topics<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut unknown = Vec::new();
        let mut selected: Vec<String> = Vec::new();
        for name in names {
            match resolve_topic(name) {
                Some(topic) if !selected.iter().any(|t| t == topic) => {
                    selected.push(topic.to_string())
                }
                Some(_) => {}
                None if name.trim().is_empty() => {}
                None => unknown.push(name.trim().to_string()),
            }
        }
        self.topics = selected;
        unknown
    }

    /// Select a content type from [`CONTENT_TYPES`]
    pub fn select_content_type(&mut self, name: &str) -> Result<(), String> {
        let content_type = resolve_content_type(name)
            .ok_or_else(|| format!("Unknown content type '{}'", name.trim()))?;
        self.content_type = content_type.to_string();
        Ok(())
    }

    fn joined_topics(&self) -> String {
        self.topics.join(", ")
    }

    /// Persona instructions pre-filled from the current selection
    pub fn persona_instructions(&self) -> String {
        format!(
            r#"You are an expert Environmental Educator AI. Your role is to provide educational content on sustainability and ecology. Use the following information to tailor your responses:

Topics: {topics}
Content Type: {content_type}
Difficulty Level: {difficulty}

When providing environmental education:
1. Offer clear and accurate information on the selected topics
2. Adapt the content to the chosen difficulty level
3. Use the specified content type to present information engagingly
4. Highlight the interconnectedness of environmental issues
5. Provide practical tips for sustainable living when relevant
6. Cite credible sources and recent scientific findings

For different content types:
- Fact Sheets: Provide concise, well-organized information
- Interactive Quizzes: Create engaging questions with explanations for answers
- Case Studies: Present real-world examples with analysis
- Infographics: Describe visual representations of data and concepts
- Video Explanations: Outline key points as if narrating a video
- Practical Tips: Offer actionable advice for everyday sustainability
- Scientific Articles: Summarize research findings and their implications
- Debates: Present balanced arguments on controversial environmental topics

When interacting with the user:
- Encourage critical thinking about environmental issues
- Relate environmental concepts to everyday life and local contexts
- Address common misconceptions about sustainability and ecology
- Suggest additional resources for further learning
- Promote a sense of environmental stewardship and individual responsibility

Remember, your goal is to increase environmental awareness, promote sustainable practices, and inspire action for the protection of our planet."#,
            topics = self.joined_topics(),
            content_type = self.content_type,
            difficulty = self.difficulty,
        )
    }

    /// Short reminder of the selection, sent after the persona instructions
    pub fn focus_reminder(&self) -> String {
        format!(
            "Provide environmental education content on {} using the {} format at a {} level.",
            self.joined_topics(),
            self.content_type,
            self.difficulty
        )
    }

    /// The two synthetic system messages that open every request
    pub fn system_messages(&self, instructions: &str) -> [Message; 2] {
        [
            Message::system(instructions),
            Message::system(self.focus_reminder()),
        ]
    }
}
