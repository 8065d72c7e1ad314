//! Single-document question answering: the document text is inlined into
//! one prompt together with the question.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::transcript::Message;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document {0} contains no text")]
    Empty(String),
    #[error("please enter a valid question")]
    EmptyQuestion,
}

/// Extracted document text.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    text: String,
}

impl Document {
    /// Read a UTF-8 text file.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let text = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tracing::debug!(document = %name, chars = text.chars().count(), "document loaded");
        Self::from_text(name, text)
    }

    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Result<Self, DocumentError> {
        let name = name.into();
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DocumentError::Empty(name));
        }
        Ok(Self { name, text })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prompt(&self, question: &str) -> Result<String, DocumentError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DocumentError::EmptyQuestion);
        }
        Ok(format!(
            "You are a document question answering assistant.\n\
             Here is the document content:\n\
             {}\n\n\
             Answer this question based on the document:\n\
             {}\n",
            self.text, question
        ))
    }

    /// The request context: one user message, no system prompt.
    pub fn messages(&self, question: &str) -> Result<Vec<Message>, DocumentError> {
        Ok(vec![Message::user(self.prompt(question)?)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Role;

    #[test]
    fn prompt_embeds_document_and_question() {
        let doc = Document::from_text("notes.txt", "The sky is green on Tuesdays.").unwrap();
        let prompt = doc.prompt("  What colour is the sky on Tuesday? ").unwrap();
        assert!(prompt.starts_with("You are a document question answering assistant."));
        assert!(prompt.contains("Here is the document content:\nThe sky is green on Tuesdays.\n\n"));
        assert!(prompt.ends_with("based on the document:\nWhat colour is the sky on Tuesday?\n"));
    }

    #[test]
    fn blank_question_is_rejected() {
        let doc = Document::from_text("a", "text").unwrap();
        assert!(matches!(doc.prompt(" \n"), Err(DocumentError::EmptyQuestion)));
    }

    #[test]
    fn blank_document_is_rejected() {
        assert!(matches!(
            Document::from_text("empty.txt", "\n\n"),
            Err(DocumentError::Empty(name)) if name == "empty.txt"
        ));
    }

    #[test]
    fn messages_are_a_single_user_turn() {
        let doc = Document::from_text("a", "text").unwrap();
        let msgs = doc.messages("why?").unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, Role::User);
    }
}
