//! Flattening an analyzed page into box lists.

use super::iterator::{PageIterator, PageLevel};
use super::{BoxItem, LayoutFlags, TextItem, TextUnit};

/// Walks a page once at a chosen granularity.
pub struct BoxExtractor;

impl BoxExtractor {
    /// Geometry at `unit` granularity, in reading order.
    pub fn boxes(iter: Option<PageIterator<'_>>, unit: TextUnit) -> Vec<BoxItem> {
        Self::extract(iter, unit, false)
            .into_iter()
            .map(BoxItem::from)
            .collect()
    }

    /// Geometry plus recognized text at `unit` granularity.
    pub fn text_boxes(iter: Option<PageIterator<'_>>, unit: TextUnit) -> Vec<TextItem> {
        Self::extract(iter, unit, true)
    }

    /// Shared traversal. Text and confidence are only read when `with_text`.
    fn extract(iter: Option<PageIterator<'_>>, unit: TextUnit, with_text: bool) -> Vec<TextItem> {
        let Some(mut iter) = iter else {
            return Vec::new();
        };

        let level = unit.level();
        let mut items = Vec::new();
        iter.begin();

        loop {
            let Some(rect) = iter.bounding_box(level) else {
                break;
            };

            let mut flags = LayoutFlags::empty();
            if level > PageLevel::Line {
                if iter.is_at_beginning_of(PageLevel::Line) {
                    flags |= LayoutFlags::START_OF_LINE;
                }
                if iter.is_at_final_element(PageLevel::Line, level) {
                    flags |= LayoutFlags::END_OF_LINE;
                }
            }

            let (text, confidence) = if with_text {
                let text = iter.text(level).unwrap_or_default();
                let confidence = iter.confidence(level).unwrap_or(0.0) * 0.01;
                // NaN survives `clamp`.
                let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
                (text, confidence)
            } else {
                (String::new(), 0.0)
            };

            items.push(TextItem {
                rect,
                flags,
                confidence,
                text,
            });

            if !iter.next(level) {
                break;
            }
        }

        items
    }
}
