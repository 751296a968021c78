//! Prompt construction for the rewrite and translation calls.
//!
//! Translation prompts are typed: a [`PromptTemplate`] knows exactly two fields, `{context}` and
//! `{question}`, both of which must appear in the template. Unknown placeholders and missing
//! fields are rejected when the template is parsed, so rendering can never fail. Literal braces
//! are written as `{{` and `}}`.

use super::language::LanguagePair;
use std::path::Path;
use thiserror::Error;

/// Errors raised while parsing or loading a prompt template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Template references a placeholder other than `{context}` or `{question}`.
    #[error("unknown template field '{{{0}}}'; only {{context}} and {{question}} are supported")]
    UnknownField(String),
    /// A required placeholder does not appear in the template.
    #[error("template is missing the required field '{{{0}}}'")]
    MissingField(&'static str),
    /// A `{` was opened but never closed, or a lone `}` appeared.
    #[error("unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),
    /// Template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Io {
        /// Path of the template file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Values substituted into a [`PromptTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct PromptFields<'a> {
    /// Retrieved reference pairs, already joined into one block.
    pub context: &'a str,
    /// The user's original input.
    pub question: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Context,
    Question,
}

/// Parsed translation prompt with validated `{context}` and `{question}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse template text, validating its placeholders.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        name.push(inner);
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace(offset));
                    }
                    let segment = match name.trim() {
                        "context" => Segment::Context,
                        "question" => Segment::Question,
                        _ => return Err(TemplateError::UnknownField(name)),
                    };
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                }
                '}' => return Err(TemplateError::UnbalancedBrace(offset)),
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments.contains(&Segment::Context) {
            return Err(TemplateError::MissingField("context"));
        }
        if !segments.contains(&Segment::Question) {
            return Err(TemplateError::MissingField("question"));
        }

        Ok(Self { segments })
    }

    /// Read and parse a template file.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Bidirectional translation prompt for the configured language pair.
    pub fn translation_default(languages: &LanguagePair) -> Self {
        let source = &languages.source_name;
        let target = &languages.target_name;
        let header = format!(
            "You are a highly efficient bilingual translation assistant.\n\
             Your task is to provide the best possible translation for the user's QUESTION.\n\n\
             If the QUESTION is in {source}, translate it into {target}.\n\
             If the QUESTION is in {target}, translate it into {source}.\n\n\
             Use the provided CONTEXT (translation pairs) only as a reference or example.\n\
             If the provided CONTEXT does not contain a direct translation, use your general \
             language knowledge to translate the QUESTION.\n\n\
             CONTEXT (Reference Pairs):\n"
        );

        Self {
            segments: vec![
                Segment::Literal(header),
                Segment::Context,
                Segment::Literal("\n\nQUESTION: ".into()),
                Segment::Question,
                Segment::Literal(
                    "\n\nTRANSLATION (Provide ONLY the translated sentence):\n".into(),
                ),
            ],
        }
    }

    /// Substitute the fields into the template.
    pub fn render(&self, fields: PromptFields<'_>) -> String {
        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Context => rendered.push_str(fields.context),
                Segment::Question => rendered.push_str(fields.question),
            }
        }
        rendered
    }
}

/// Join retrieved chunk texts into a single context block.
pub fn format_context<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.as_ref())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Prompt asking the model to translate source-language input for retrieval.
pub fn rewrite_prompt(text: &str, languages: &LanguagePair) -> String {
    format!(
        "Translate this {} text into {}. Reply with only the translated text and no explanation: {text}",
        languages.source_name, languages.target_name
    )
}
