use serde::Serialize;

/// Placeholder printed wherever an input artifact is missing.
pub const NOT_AVAILABLE: &str = "Content not available";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Title(String),
    Field { label: String, value: String },
    Heading(String),
    Subheading(String),
    Paragraph(String),
    Bullets(Vec<String>),
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Monospaced lines, already wrapped.
    Preformatted(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: usize,
    pub blocks: Vec<Block>,
}

/// A paginated report, independent of the output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportDocument {
    pub title: String,
    pub file_name: String,
    pub pages: Vec<Page>,
}

impl ReportDocument {
    #[must_use]
    pub fn new(title: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            file_name: file_name.into(),
            pages: Vec::new(),
        }
    }

    /// Open a new page and return it for filling.
    pub fn new_page(&mut self) -> &mut Page {
        let number = self.pages.len() + 1;
        self.pages.push(Page {
            number,
            blocks: Vec::new(),
        });
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }

    /// Value of a `Field` block, or of a `label: value` bullet.
    #[must_use]
    pub fn field(&self, label: &str) -> Option<String> {
        let prefix = format!("{label}: ");
        self.blocks().find_map(|block| match block {
            Block::Field { label: l, value } if l == label => Some(value.clone()),
            Block::Bullets(items) => items
                .iter()
                .find_map(|item| item.strip_prefix(&prefix).map(str::to_string)),
            _ => None,
        })
    }
}

impl Page {
    #[must_use]
    pub fn footer(&self) -> String {
        format!("Page {}", self.number)
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Heading(text.into()))
    }

    pub fn subheading(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Subheading(text.into()))
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Block::Paragraph(text.into()))
    }

    pub fn field(&mut self, label: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.push(Block::Field {
            label: label.into(),
            value: value.into(),
        })
    }

    pub fn unavailable(&mut self) -> &mut Self {
        self.paragraph(NOT_AVAILABLE)
    }
}
