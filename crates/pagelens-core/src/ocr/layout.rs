//! Geometric page segmentation.
//!
//! Splits a binarized page into blocks, paragraphs, text lines, words and
//! symbols without reading any text.

use image::GrayImage;
use tracing::debug;

use super::Rect;
use super::preprocessing::INK;
use super::variables::BackendVariables;

/// A word and, once recognition has run, its text.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub rect: Rect,
    /// Symbol boxes in left-to-right order.
    pub symbols: Vec<Rect>,
    pub text: String,
    /// Recognition confidence as a percentage (0 - 100).
    pub confidence: f32,
}

impl Word {
    /// A word with no symbol breakdown.
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            symbols: Vec::new(),
            text: String::new(),
            confidence: 0.0,
        }
    }

    /// A word spanning the given symbols.
    pub fn from_symbols(symbols: Vec<Rect>) -> Self {
        let rect = Rect::enclosing(&symbols).unwrap_or_default();
        Self {
            rect,
            symbols,
            text: String::new(),
            confidence: 0.0,
        }
    }

    /// Attach recognized text and its percentage confidence.
    pub fn with_text(mut self, text: impl Into<String>, confidence: f32) -> Self {
        self.text = text.into();
        self.confidence = confidence;
        self
    }
}

/// A single line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub rect: Rect,
    pub words: Vec<Word>,
}

impl TextLine {
    pub fn new(words: Vec<Word>) -> Self {
        let rect = Rect::enclosing(words.iter().map(|w| &w.rect)).unwrap_or_default();
        Self { rect, words }
    }

    /// Words joined by spaces.
    ///
    /// With `preserve_spaces`, wide gaps become several spaces, one per
    /// average symbol width.
    pub fn text(&self, preserve_spaces: bool) -> String {
        let unit = self.average_symbol_width();
        let mut text = String::new();

        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                let spaces = if preserve_spaces {
                    let gap = (word.rect.left - self.words[i - 1].rect.right).max(0) as f32;
                    ((gap / unit).round() as usize).max(1)
                } else {
                    1
                };
                text.extend(std::iter::repeat_n(' ', spaces));
            }
            text.push_str(&word.text);
        }

        text
    }

    pub fn confidence(&self) -> f32 {
        mean_confidence(self.words.iter())
    }

    fn average_symbol_width(&self) -> f32 {
        let (total, count) = self
            .words
            .iter()
            .flat_map(|w| w.symbols.iter())
            .fold((0i64, 0i64), |(t, c), s| (t + s.width() as i64, c + 1));

        if count == 0 {
            (self.rect.height() as f32 / 2.0).max(1.0)
        } else {
            (total as f32 / count as f32).max(1.0)
        }
    }
}

/// Consecutive lines without a large vertical gap.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub rect: Rect,
    pub lines: Vec<TextLine>,
}

impl Paragraph {
    pub fn new(lines: Vec<TextLine>) -> Self {
        let rect = Rect::enclosing(lines.iter().map(|l| &l.rect)).unwrap_or_default();
        Self { rect, lines }
    }

    pub fn text(&self, preserve_spaces: bool) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(&line.text(preserve_spaces));
            text.push('\n');
        }
        text
    }

    pub fn confidence(&self) -> f32 {
        mean_confidence(self.lines.iter().flat_map(|l| l.words.iter()))
    }
}

/// A column-like region of paragraphs.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub rect: Rect,
    pub paragraphs: Vec<Paragraph>,
}

impl Block {
    pub fn new(paragraphs: Vec<Paragraph>) -> Self {
        let rect = Rect::enclosing(paragraphs.iter().map(|p| &p.rect)).unwrap_or_default();
        Self { rect, paragraphs }
    }

    pub fn text(&self, preserve_spaces: bool) -> String {
        let mut text = String::new();
        for paragraph in &self.paragraphs {
            text.push_str(&paragraph.text(preserve_spaces));
            text.push('\n');
        }
        text
    }

    pub fn confidence(&self) -> f32 {
        mean_confidence(self.words())
    }

    fn words(&self) -> impl Iterator<Item = &Word> {
        self.paragraphs
            .iter()
            .flat_map(|p| p.lines.iter())
            .flat_map(|l| l.words.iter())
    }
}

/// Segmentation result for one page, in reading order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub blocks: Vec<Block>,
}

impl PageLayout {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// All words in reading order.
    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.blocks.iter().flat_map(|b| b.words())
    }

    pub fn words_mut(&mut self) -> impl Iterator<Item = &mut Word> {
        self.blocks
            .iter_mut()
            .flat_map(|b| b.paragraphs.iter_mut())
            .flat_map(|p| p.lines.iter_mut())
            .flat_map(|l| l.words.iter_mut())
    }

    pub fn word_count(&self) -> usize {
        self.words().count()
    }

    /// Forget recognized text, keeping the geometry.
    pub fn clear_recognition(&mut self) {
        for word in self.words_mut() {
            word.text.clear();
            word.confidence = 0.0;
        }
    }

    /// Page text: one line per text line, a blank line after each paragraph.
    pub fn utf8_text(&self, preserve_spaces: bool) -> String {
        self.blocks
            .iter()
            .flat_map(|b| b.paragraphs.iter())
            .map(|p| {
                let mut text = p.text(preserve_spaces);
                text.push('\n');
                text
            })
            .collect()
    }
}

pub(crate) fn mean_confidence<'a>(words: impl Iterator<Item = &'a Word>) -> f32 {
    let (sum, count) = words.fold((0.0f32, 0usize), |(s, c), w| (s + w.confidence, c + 1));
    if count == 0 { 0.0 } else { sum / count as f32 }
}

/// Connected-component layout analyzer.
pub struct LayoutAnalyzer<'a> {
    vars: &'a BackendVariables,
}

impl<'a> LayoutAnalyzer<'a> {
    pub fn new(vars: &'a BackendVariables) -> Self {
        Self { vars }
    }

    /// Segment a binarized page (foreground pixels are `INK`).
    pub fn analyze(&self, binary: &GrayImage) -> PageLayout {
        let components = self.find_components(binary);
        debug!("Found {} connected components", components.len());

        if components.is_empty() {
            return PageLayout::default();
        }

        let symbol_height = median(components.iter().map(|c| c.height()));
        let lines: Vec<TextLine> = self
            .group_lines(components, symbol_height)
            .into_iter()
            .map(|symbols| TextLine::new(self.split_words(symbols)))
            .collect();

        let blocks = self.group_blocks(lines);

        debug!(
            "Layout: {} blocks, {} paragraphs, {} lines",
            blocks.len(),
            blocks.iter().map(|b| b.paragraphs.len()).sum::<usize>(),
            blocks
                .iter()
                .flat_map(|b| b.paragraphs.iter())
                .map(|p| p.lines.len())
                .sum::<usize>()
        );

        PageLayout::new(blocks)
    }

    fn find_components(&self, binary: &GrayImage) -> Vec<Rect> {
        let (width, height) = binary.dimensions();
        let (w, h) = (width as usize, height as usize);
        let raw = binary.as_raw();

        let mut visited = vec![false; w * h];
        let mut components = Vec::new();
        let mut stack = Vec::new();

        for start in 0..w * h {
            if visited[start] || raw[start] != INK {
                continue;
            }

            visited[start] = true;
            stack.push(start);

            let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
            let (mut max_x, mut max_y) = (0usize, 0usize);
            let mut count = 0u32;

            while let Some(idx) = stack.pop() {
                let (x, y) = (idx % w, idx / w);
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                count += 1;

                // 8-connected neighbours
                for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                        let n = ny * w + nx;
                        if !visited[n] && raw[n] == INK {
                            visited[n] = true;
                            stack.push(n);
                        }
                    }
                }
            }

            if count < self.vars.min_blob_area {
                continue;
            }

            let rect = Rect::new(
                min_x as i32,
                min_y as i32,
                max_x as i32 + 1,
                max_y as i32 + 1,
            );

            // Rules, borders and pictures, not text.
            if rect.width() as u32 > width / 2 && rect.height() as u32 > height / 2 {
                continue;
            }

            components.push(rect);
        }

        components
    }

    /// Assign components to text lines by vertical overlap.
    fn group_lines(&self, mut components: Vec<Rect>, symbol_height: i32) -> Vec<Vec<Rect>> {
        components.sort_by_key(|c| (c.top, c.left));

        let column_gap = (self.vars.block_gap * symbol_height as f32).max(1.0) as i32;
        let mut lines: Vec<(Rect, Vec<Rect>)> = Vec::new();

        for comp in components {
            let best = lines
                .iter()
                .enumerate()
                .filter(|(_, (rect, _))| horizontal_distance(rect, &comp) <= column_gap)
                .map(|(i, (rect, _))| {
                    let shorter = rect.height().min(comp.height()).max(1);
                    (i, rect.vertical_overlap(&comp) as f32 / shorter as f32)
                })
                .filter(|(_, ratio)| *ratio >= self.vars.line_overlap)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(i, _)| i);

            match best {
                Some(i) => {
                    lines[i].0 = lines[i].0.union(&comp);
                    lines[i].1.push(comp);
                }
                None => lines.push((comp, vec![comp])),
            }
        }

        // Fold dots and accents, which end up as short lines of their own,
        // into the nearest full-height line they sit over.
        let mut i = 0;
        while i < lines.len() {
            let (rect, _) = &lines[i];
            if rect.height() * 2 >= symbol_height {
                i += 1;
                continue;
            }

            let target = lines
                .iter()
                .enumerate()
                .filter(|(j, (other, _))| {
                    *j != i
                        && other.height() * 2 >= symbol_height
                        && other.horizontal_overlap(rect) > 0
                        && vertical_distance(other, rect) < symbol_height
                })
                .min_by_key(|(_, (other, _))| vertical_distance(other, rect))
                .map(|(j, _)| j);

            match target {
                Some(j) => {
                    let (rect, symbols) = lines.remove(i);
                    let j = if j > i { j - 1 } else { j };
                    lines[j].0 = lines[j].0.union(&rect);
                    lines[j].1.extend(symbols);
                }
                None => i += 1,
            }
        }

        lines.into_iter().map(|(_, symbols)| symbols).collect()
    }

    /// Split a line's components into words at wide horizontal gaps.
    fn split_words(&self, mut components: Vec<Rect>) -> Vec<Word> {
        components.sort_by_key(|c| c.left);

        // Components that mostly overlap horizontally form one symbol (i, j, accents).
        let mut symbols: Vec<Rect> = Vec::with_capacity(components.len());
        for comp in components {
            match symbols.last_mut() {
                Some(last)
                    if last.horizontal_overlap(&comp) * 2 >= last.width().min(comp.width()) =>
                {
                    *last = last.union(&comp);
                }
                _ => symbols.push(comp),
            }
        }

        let height = median(symbols.iter().map(|s| s.height()));
        let gap_limit = self.vars.word_gap * height as f32;

        let mut words = Vec::new();
        let mut current: Vec<Rect> = Vec::new();
        let mut right = i32::MIN;

        for symbol in symbols {
            if !current.is_empty() && (symbol.left - right) as f32 > gap_limit {
                words.push(Word::from_symbols(std::mem::take(&mut current)));
            }
            right = right.max(symbol.right);
            current.push(symbol);
        }
        if !current.is_empty() {
            words.push(Word::from_symbols(current));
        }

        words
    }

    /// Group lines into blocks by column, then blocks into paragraphs.
    fn group_blocks(&self, mut lines: Vec<TextLine>) -> Vec<Block> {
        lines.sort_by_key(|l| (l.rect.top, l.rect.left));

        let line_height = median(lines.iter().map(|l| l.rect.height()));
        let block_limit = self.vars.block_gap * line_height as f32;
        let paragraph_limit = self.vars.paragraph_gap * line_height as f32;

        let mut columns: Vec<(Rect, Vec<TextLine>)> = Vec::new();

        for line in lines {
            let target = columns
                .iter()
                .enumerate()
                .filter(|(_, (rect, _))| rect.horizontal_overlap(&line.rect) > 0)
                .filter_map(|(i, (_, col))| {
                    let last = col.last()?;
                    let gap = line.rect.top - last.rect.bottom;
                    (gap as f32 <= block_limit).then_some((i, gap))
                })
                .min_by_key(|(_, gap)| *gap)
                .map(|(i, _)| i);

            match target {
                Some(i) => {
                    columns[i].0 = columns[i].0.union(&line.rect);
                    columns[i].1.push(line);
                }
                None => columns.push((line.rect, vec![line])),
            }
        }

        let mut blocks: Vec<Block> = columns
            .into_iter()
            .map(|(_, col)| {
                let mut paragraphs = Vec::new();
                let mut current: Vec<TextLine> = Vec::new();

                for line in col {
                    if let Some(prev) = current.last() {
                        let gap = line.rect.top - prev.rect.bottom;
                        if gap as f32 > paragraph_limit {
                            paragraphs.push(Paragraph::new(std::mem::take(&mut current)));
                        }
                    }
                    current.push(line);
                }
                if !current.is_empty() {
                    paragraphs.push(Paragraph::new(current));
                }

                Block::new(paragraphs)
            })
            .collect();

        blocks.sort_by_key(|b| (b.rect.top, b.rect.left));
        blocks
    }
}

fn median(values: impl Iterator<Item = i32>) -> i32 {
    let mut values: Vec<i32> = values.collect();
    if values.is_empty() {
        return 1;
    }
    values.sort_unstable();
    values[values.len() / 2].max(1)
}

fn horizontal_distance(a: &Rect, b: &Rect) -> i32 {
    (a.left.max(b.left) - a.right.min(b.right)).max(0)
}

fn vertical_distance(a: &Rect, b: &Rect) -> i32 {
    (a.top.max(b.top) - a.bottom.min(b.bottom)).max(0)
}
