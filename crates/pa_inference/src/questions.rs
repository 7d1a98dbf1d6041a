//! Interview-question generation.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use pa_core::{Error, GenerationOptions, InferenceModel, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::extract::extract_json_object;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    /// Questions combine several topics
    #[default]
    Combined,
    /// Questions per topic
    Individual,
    /// Questions from the selected topics only
    Selective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Conceptual,
    Coding,
    #[default]
    Both,
}

impl fmt::Display for QuizMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuizMode::Combined => "combined",
            QuizMode::Individual => "individual",
            QuizMode::Selective => "selective",
        })
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QuestionType::Conceptual => "conceptual",
            QuestionType::Coding => "coding",
            QuestionType::Both => "both",
        })
    }
}

impl FromStr for QuizMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "combined" => Ok(QuizMode::Combined),
            "individual" => Ok(QuizMode::Individual),
            "selective" => Ok(QuizMode::Selective),
            other => Err(Error::Config(format!("Unknown quiz mode: {}", other))),
        }
    }
}

impl FromStr for QuestionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "conceptual" => Ok(QuestionType::Conceptual),
            "coding" => Ok(QuestionType::Coding),
            "both" => Ok(QuestionType::Both),
            other => Err(Error::Config(format!("Unknown question type: {}", other))),
        }
    }
}

pub const DEFAULT_QUESTION_COUNT: u32 = 15;
pub const MAX_QUESTION_COUNT: u32 = 50;

fn default_question_count() -> u32 {
    DEFAULT_QUESTION_COUNT
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    pub topics: Vec<String>,
    #[serde(default)]
    pub mode: QuizMode,
    #[serde(default)]
    pub question_type: QuestionType,
    #[serde(default = "default_question_count")]
    pub num_questions: u32,
}

impl QuizRequest {
    pub fn new(topics: Vec<String>) -> Self {
        Self {
            topics,
            mode: QuizMode::default(),
            question_type: QuestionType::default(),
            num_questions: DEFAULT_QUESTION_COUNT,
        }
    }

    /// Rejects an empty topic list; the question count is clamped to 1..=50.
    pub fn validate(mut self) -> Result<Self> {
        self.topics.retain(|t| !t.trim().is_empty());
        if self.topics.is_empty() {
            return Err(Error::Config("No topics selected".to_string()));
        }
        self.num_questions = self.num_questions.clamp(1, MAX_QUESTION_COUNT);
        Ok(self)
    }

    pub fn prompt(&self) -> String {
        format!(
            "You are a senior technical interviewer at a top product-based company.\n\
             \n\
             Your task is to generate ONLY QUESTIONS (no answers, no hints, no explanations).\n\
             \n\
             ### STRICT RULES:\n\
             - Do NOT include answers or solutions.\n\
             - Do NOT include explanations.\n\
             - Do NOT generate beginner or definition-only questions.\n\
             - Difficulty level: Intermediate to Advanced (Interview level).\n\
             - Questions must test practical understanding, edge cases, trade-offs and real-world scenarios.\n\
             \n\
             ### TOPICS:\n{topics}\n\
             \n\
             ### QUIZ MODE:\n{mode}\n\
             \n\
             Rules for quiz mode:\n\
             - combined: questions must combine multiple topics together.\n\
             - individual: generate questions separately for each topic.\n\
             - selective: generate questions ONLY from the selected topics.\n\
             \n\
             ### QUESTION TYPE:\n{question_type}\n\
             \n\
             Rules for question type:\n\
             - conceptual: theory, design, architecture, reasoning questions.\n\
             - coding: implementation, debugging, optimization, edge-case handling.\n\
             - both: mix conceptual and coding questions evenly.\n\
             \n\
             ### NUMBER OF QUESTIONS:\n{count}\n\
             \n\
             ### OUTPUT FORMAT:\n\
             - Numbered list\n\
             - Questions only\n\
             - No headings\n\
             - No topic names in output\n",
            topics = self.topics.join(", "),
            mode = self.mode,
            question_type = self.question_type,
            count = self.num_questions,
        )
    }
}

fn numbered_line() -> &'static Regex {
    static NUMBERED: OnceLock<Regex> = OnceLock::new();
    NUMBERED.get_or_init(|| {
        Regex::new(r"^\s*(?:\*\*)?\d+[.)]\s*(?:\*\*)?\s*(.+?)\s*$").expect("valid numbered-line pattern")
    })
}

/// Splits a numbered-list reply into question strings. Lines that do not start
/// a numbered item are appended to the previous question.
pub fn parse_numbered_questions(text: &str) -> Vec<String> {
    let re = numbered_line();

    let mut questions: Vec<String> = Vec::new();
    for line in text.lines() {
        if let Some(caps) = re.captures(line) {
            questions.push(caps[1].to_string());
        } else if let Some(last) = questions.last_mut() {
            let line = line.trim();
            if !line.is_empty() {
                last.push(' ');
                last.push_str(line);
            }
        }
    }
    questions
}

/// One question with its answer, produced from a free-form prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyQuestion {
    pub question: String,
    pub answer: String,
    pub category: String,
}

pub fn daily_prompt(prompt: &str) -> String {
    format!(
        "{prompt}\n\n\
         Respond with a single JSON object and nothing else, with the keys \
         \"question\", \"answer\" and \"category\"."
    )
}

/// Parses the model's reply. Unlike news extraction there is no partial result,
/// so anything unusable is an error.
pub fn parse_daily_question(text: &str) -> Result<DailyQuestion> {
    let object = extract_json_object(text)
        .ok_or_else(|| Error::Inference("Failed to parse AI response".to_string()))?;

    let field = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(DailyQuestion {
        question: field("question")
            .ok_or_else(|| Error::Inference("AI response has no question".to_string()))?,
        answer: field("answer")
            .ok_or_else(|| Error::Inference("AI response has no answer".to_string()))?,
        category: field("category").unwrap_or_else(|| "general".to_string()),
    })
}

/// Output of a quiz run: the parsed list plus the raw model text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedQuestions {
    pub questions: Vec<String>,
    pub raw: String,
}

#[derive(Debug, Clone)]
pub struct QuestionGenerator {
    model: Arc<dyn InferenceModel>,
}

impl QuestionGenerator {
    pub fn new(model: Arc<dyn InferenceModel>) -> Self {
        Self { model }
    }

    pub async fn generate_quiz(&self, request: QuizRequest) -> Result<GeneratedQuestions> {
        let request = request.validate()?;
        self.generate_from_prompt(&request.prompt()).await
    }

    /// Runs a caller-written prompt and parses a numbered list out of the reply.
    pub async fn generate_from_prompt(&self, prompt: &str) -> Result<GeneratedQuestions> {
        if prompt.trim().is_empty() {
            return Err(Error::Config("Prompt is required".to_string()));
        }
        let raw = self.model.generate(prompt, GenerationOptions::default()).await?;
        let questions = parse_numbered_questions(&raw);
        info!(model = self.model.name(), count = questions.len(), "❓ Generated questions");
        Ok(GeneratedQuestions { questions, raw })
    }

    pub async fn generate_daily(&self, prompt: &str) -> Result<DailyQuestion> {
        if prompt.trim().is_empty() {
            return Err(Error::Config("Prompt is required".to_string()));
        }
        let reply = self.model.generate(&daily_prompt(prompt), GenerationOptions::json()).await?;
        parse_daily_question(&reply)
    }
}
