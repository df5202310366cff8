//! Assessment templates: ordered sections of typed questions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown section: {0}")]
    UnknownSection(String),
    #[error("unknown item: {0}")]
    UnknownItem(String),
    #[error("index {index} out of range for {len} entries")]
    OutOfRange { index: usize, len: usize },
    #[error("duplicate id: {0}")]
    DuplicateId(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Each response kind carries only the settings that apply to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseKind {
    Scale {
        min: i32,
        max: i32,
        #[serde(default)]
        labels: Vec<String>,
    },
    SingleChoice {
        options: Vec<ChoiceOption>,
    },
    MultipleChoice {
        options: Vec<ChoiceOption>,
        #[serde(default, rename = "maxSelections")]
        max_selections: Option<usize>,
    },
    Text {
        #[serde(default)]
        multiline: bool,
        #[serde(default, rename = "maxLength")]
        max_length: Option<usize>,
    },
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
        #[serde(default)]
        unit: Option<String>,
    },
    Date,
    YesNo,
}

/// A recorded answer to one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Answer {
    Flag(bool),
    Number(f64),
    Choices(Vec<String>),
    Text(String),
}

impl ResponseKind {
    pub fn accepts(&self, answer: &Answer) -> bool {
        match (self, answer) {
            (Self::Scale { min, max, .. }, Answer::Number(value)) => {
                value.fract() == 0.0 && *value >= f64::from(*min) && *value <= f64::from(*max)
            }
            (Self::SingleChoice { options }, Answer::Text(value)) => {
                options.iter().any(|opt| &opt.value == value)
            }
            (Self::MultipleChoice { options, max_selections }, Answer::Choices(values)) => {
                let known = values
                    .iter()
                    .all(|value| options.iter().any(|opt| &opt.value == value));
                known && max_selections.is_none_or(|limit| values.len() <= limit)
            }
            (Self::Text { max_length, .. }, Answer::Text(value)) => {
                max_length.is_none_or(|limit| value.chars().count() <= limit)
            }
            (Self::Number { min, max, .. }, Answer::Number(value)) => {
                min.is_none_or(|lo| *value >= lo) && max.is_none_or(|hi| *value <= hi)
            }
            (Self::Date, Answer::Text(value)) => {
                NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
            }
            (Self::YesNo, Answer::Flag(_)) => true,
            _ => false,
        }
    }

    /// Score of a choice answer, when the options carry scores.
    pub fn score(&self, answer: &Answer) -> Option<f64> {
        let options = match self {
            Self::SingleChoice { options } | Self::MultipleChoice { options, .. } => options,
            _ => return None,
        };
        let picked: Vec<&str> = match answer {
            Answer::Text(value) => vec![value.as_str()],
            Answer::Choices(values) => values.iter().map(String::as_str).collect(),
            _ => return None,
        };
        picked
            .into_iter()
            .map(|value| {
                options
                    .iter()
                    .find(|opt| opt.value == value)
                    .and_then(|opt| opt.score)
            })
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateItem {
    pub id: String,
    pub prompt: String,
    #[serde(default)]
    pub required: bool,
    pub response: ResponseKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSection {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<TemplateItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sections: Vec<TemplateSection>,
}

impl AssessmentTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sections: vec![],
        }
    }

    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|section| section.items.len()).sum()
    }

    pub fn add_section(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<(), TemplateError> {
        let id = id.into();
        if self.sections.iter().any(|section| section.id == id) {
            return Err(TemplateError::DuplicateId(id));
        }
        self.sections.push(TemplateSection {
            id,
            title: title.into(),
            items: vec![],
        });
        Ok(())
    }

    pub fn add_item(&mut self, section_id: &str, item: TemplateItem) -> Result<(), TemplateError> {
        if self.find_item(&item.id).is_some() {
            return Err(TemplateError::DuplicateId(item.id));
        }
        self.section_mut(section_id)?.items.push(item);
        Ok(())
    }

    pub fn find_item(&self, item_id: &str) -> Option<(&TemplateSection, &TemplateItem)> {
        self.sections.iter().find_map(|section| {
            section
                .items
                .iter()
                .find(|item| item.id == item_id)
                .map(|item| (section, item))
        })
    }

    pub fn move_section(&mut self, from: usize, to: usize) -> Result<(), TemplateError> {
        move_within(&mut self.sections, from, to)
    }

    pub fn move_item(&mut self, section_id: &str, from: usize, to: usize) -> Result<(), TemplateError> {
        move_within(&mut self.section_mut(section_id)?.items, from, to)
    }

    /// Drops an item into another section at `index` (clamped to the end).
    pub fn move_item_to_section(
        &mut self,
        item_id: &str,
        target_section_id: &str,
        index: usize,
    ) -> Result<(), TemplateError> {
        if !self.sections.iter().any(|section| section.id == target_section_id) {
            return Err(TemplateError::UnknownSection(target_section_id.to_string()));
        }
        let item = self.remove_item(item_id)?;
        let target = self.section_mut(target_section_id)?;
        let index = index.min(target.items.len());
        target.items.insert(index, item);
        tracing::debug!(item = item_id, section = target_section_id, index, "moved template item");
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: &str) -> Result<TemplateItem, TemplateError> {
        for section in &mut self.sections {
            if let Some(idx) = section.items.iter().position(|item| item.id == item_id) {
                return Ok(section.items.remove(idx));
            }
        }
        Err(TemplateError::UnknownItem(item_id.to_string()))
    }

    fn section_mut(&mut self, section_id: &str) -> Result<&mut TemplateSection, TemplateError> {
        self.sections
            .iter_mut()
            .find(|section| section.id == section_id)
            .ok_or_else(|| TemplateError::UnknownSection(section_id.to_string()))
    }
}

fn move_within<T>(entries: &mut Vec<T>, from: usize, to: usize) -> Result<(), TemplateError> {
    let len = entries.len();
    for index in [from, to] {
        if index >= len {
            return Err(TemplateError::OutOfRange { index, len });
        }
    }
    let entry = entries.remove(from);
    entries.insert(to, entry);
    Ok(())
}
