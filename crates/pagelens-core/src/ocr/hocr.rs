//! hOCR output.

use quick_xml::escape::escape;

use super::Rect;
use super::layout::PageLayout;

/// Wraps a backend page fragment in a complete hOCR document.
pub struct HocrRenderer {
    system: String,
}

impl HocrRenderer {
    /// `system` is reported in the `ocr-system` meta tag.
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }

    /// Complete XHTML document around an already well-formed fragment.
    pub fn render(&self, fragment: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"en\" lang=\"en\">\n\
             <head>\n  \
             <title>hOCR text</title>\n  \
             <meta http-equiv=\"Content-Type\" content=\"text/html;charset=utf-8\"/>\n  \
             <meta name='ocr-system' content='{}' />\n  \
             <meta name='ocr-capabilities' content='ocr_page ocr_carea ocr_par ocr_line ocrx_word ocrp_wconf' />\n\
             </head>\n\
             <body>\n\
             {}\
             </body>\n\
             </html>\n",
            escape(self.system.as_str()),
            fragment
        )
    }
}

/// hOCR markup for one analyzed page.
///
/// Element ids are numbered from 1 in document order within the page:
/// `block_P_N`, `par_P_N`, `line_P_N`, `word_P_N` for page `P`.
pub fn page_fragment(layout: &PageLayout, page_number: u32, width: u32, height: u32, lang: &str) -> String {
    let page = page_number + 1;
    let lang = escape(lang);
    let (mut block_id, mut par_id, mut line_id, mut word_id) = (0, 0, 0, 0);

    let mut out = format!(
        "  <div class='ocr_page' id='page_{}' title='image \"\"; bbox 0 0 {} {}; ppageno {}'>\n",
        page, width, height, page_number
    );

    for block in &layout.blocks {
        block_id += 1;
        out.push_str(&format!(
            "   <div class='ocr_carea' id='block_{}_{}' title=\"{}\">\n",
            page,
            block_id,
            bbox(&block.rect)
        ));

        for paragraph in &block.paragraphs {
            par_id += 1;
            out.push_str(&format!(
                "    <p class='ocr_par' id='par_{}_{}' lang='{}' title=\"{}\">\n",
                page,
                par_id,
                lang,
                bbox(&paragraph.rect)
            ));

            for line in &paragraph.lines {
                line_id += 1;
                out.push_str(&format!(
                    "     <span class='ocr_line' id='line_{}_{}' title=\"{}; x_size {}\">",
                    page,
                    line_id,
                    bbox(&line.rect),
                    line.rect.height()
                ));

                for word in &line.words {
                    word_id += 1;
                    out.push_str(&format!(
                        "\n      <span class='ocrx_word' id='word_{}_{}' title='{}; x_wconf {}'>{}</span>",
                        page,
                        word_id,
                        bbox(&word.rect),
                        word.confidence.round().clamp(0.0, 100.0) as u32,
                        escape(word.text.as_str())
                    ));
                }

                out.push_str("\n     </span>\n");
            }

            out.push_str("    </p>\n");
        }

        out.push_str("   </div>\n");
    }

    out.push_str("  </div>\n");
    out
}

fn bbox(rect: &Rect) -> String {
    format!("bbox {} {} {} {}", rect.left, rect.top, rect.right, rect.bottom)
}
