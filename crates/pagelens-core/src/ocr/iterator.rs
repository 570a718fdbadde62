//! Restartable cursor over an analyzed page.

use super::Rect;
use super::layout::{PageLayout, Word};

/// Level of the layout hierarchy, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageLevel {
    Block,
    Paragraph,
    Line,
    Word,
    Symbol,
}

impl PageLevel {
    fn depth(self) -> usize {
        self as usize
    }
}

/// Index path of a symbol: block, paragraph, line, word, symbol.
type Position = [usize; 5];

/// Cursor over the elements of a [`PageLayout`].
///
/// The cursor always sits on a symbol. Moving at a coarser level skips to
/// the first symbol of the next element at that level. Words without a
/// symbol breakdown count as a single symbol.
pub struct PageIterator<'a> {
    layout: &'a PageLayout,
    positions: Vec<Position>,
    index: usize,
    preserve_spaces: bool,
}

impl<'a> PageIterator<'a> {
    /// Cursor at the first symbol, `None` when the page has no words.
    pub fn new(layout: &'a PageLayout) -> Option<Self> {
        let mut positions = Vec::new();
        for (b, block) in layout.blocks.iter().enumerate() {
            for (p, paragraph) in block.paragraphs.iter().enumerate() {
                for (l, line) in paragraph.lines.iter().enumerate() {
                    for (w, word) in line.words.iter().enumerate() {
                        for s in 0..word.symbols.len().max(1) {
                            positions.push([b, p, l, w, s]);
                        }
                    }
                }
            }
        }

        if positions.is_empty() {
            return None;
        }

        Some(Self {
            layout,
            positions,
            index: 0,
            preserve_spaces: false,
        })
    }

    /// Render line text with gap-proportional spacing.
    pub fn with_preserve_spaces(mut self, preserve: bool) -> Self {
        self.preserve_spaces = preserve;
        self
    }

    /// Move back to the first symbol of the page.
    pub fn begin(&mut self) {
        self.index = 0;
    }

    /// Advance to the start of the next element at `level`.
    ///
    /// Returns false, leaving the cursor exhausted, when there is none.
    pub fn next(&mut self, level: PageLevel) -> bool {
        let Some(current) = self.current() else {
            return false;
        };

        let depth = level.depth();
        match self.positions[self.index + 1..]
            .iter()
            .position(|p| p[..=depth] != current[..=depth])
        {
            Some(offset) => {
                self.index += offset + 1;
                true
            }
            None => {
                self.index = self.positions.len();
                false
            }
        }
    }

    /// Whether the cursor is at the first symbol of an element at `level`.
    pub fn is_at_beginning_of(&self, level: PageLevel) -> bool {
        let Some(current) = self.current() else {
            return false;
        };
        if self.index == 0 {
            return true;
        }
        let depth = level.depth();
        self.positions[self.index - 1][..=depth] != current[..=depth]
    }

    /// Whether the current `element` is the last one inside its `enclosing`
    /// element, e.g. the last word of a line.
    pub fn is_at_final_element(&self, enclosing: PageLevel, element: PageLevel) -> bool {
        let Some(current) = self.current() else {
            return false;
        };

        let depth = element.depth();
        let next = self.positions[self.index + 1..]
            .iter()
            .find(|p| p[..=depth] != current[..=depth]);

        match next {
            None => true,
            Some(next) => {
                let outer = enclosing.depth();
                next[..=outer] != current[..=outer]
            }
        }
    }

    /// Bounding box of the current element at `level`.
    pub fn bounding_box(&self, level: PageLevel) -> Option<Rect> {
        let [b, p, l, w, s] = self.current()?;
        let block = &self.layout.blocks[b];
        let rect = match level {
            PageLevel::Block => block.rect,
            PageLevel::Paragraph => block.paragraphs[p].rect,
            PageLevel::Line => block.paragraphs[p].lines[l].rect,
            PageLevel::Word => self.word()?.rect,
            PageLevel::Symbol => {
                let word = &block.paragraphs[p].lines[l].words[w];
                word.symbols.get(s).copied().unwrap_or(word.rect)
            }
        };
        Some(rect)
    }

    /// Recognized text of the current element at `level`.
    ///
    /// Block and paragraph text end with a newline per line; line text
    /// does not.
    pub fn text(&self, level: PageLevel) -> Option<String> {
        let [b, p, l, _, s] = self.current()?;
        let block = &self.layout.blocks[b];
        let text = match level {
            PageLevel::Block => block.text(self.preserve_spaces),
            PageLevel::Paragraph => block.paragraphs[p].text(self.preserve_spaces),
            PageLevel::Line => block.paragraphs[p].lines[l].text(self.preserve_spaces),
            PageLevel::Word => self.word()?.text.clone(),
            PageLevel::Symbol => self
                .word()?
                .text
                .chars()
                .nth(s)
                .map(String::from)
                .unwrap_or_default(),
        };
        Some(text)
    }

    /// Confidence of the current element at `level`, as a percentage.
    pub fn confidence(&self, level: PageLevel) -> Option<f32> {
        let [b, p, l, _, _] = self.current()?;
        let block = &self.layout.blocks[b];
        let confidence = match level {
            PageLevel::Block => block.confidence(),
            PageLevel::Paragraph => block.paragraphs[p].confidence(),
            PageLevel::Line => block.paragraphs[p].lines[l].confidence(),
            PageLevel::Word | PageLevel::Symbol => self.word()?.confidence,
        };
        Some(confidence)
    }

    fn current(&self) -> Option<Position> {
        self.positions.get(self.index).copied()
    }

    fn word(&self) -> Option<&'a Word> {
        let [b, p, l, w, _] = self.current()?;
        Some(&self.layout.blocks[b].paragraphs[p].lines[l].words[w])
    }
}
