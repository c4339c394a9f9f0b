//! HTML document generation for the two pdfium-backed converters.
//!
//! Both generators produce a single self-contained document: all images are
//! inlined as `data:` URLs and no external stylesheet or script is referenced.

use crate::pipeline::render::PageContent;

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format a CSS length with at most two decimals and no trailing zeros.
pub fn fmt_num(v: f32) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    match s {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Absolutely positioned text and images, one fixed-size box per page.
///
/// PDF points map 1:1 to CSS pixels.
pub fn render_native(title: &str, pages: &[PageContent]) -> String {
    let mut html = vec![
        "<!DOCTYPE html><html><head><meta charset=\"UTF-8\">".to_string(),
        format!("<title>{}</title>", escape_html(title)),
        "<style>".to_string(),
        ".pdf-page { position: relative; margin-bottom: 20px; }".to_string(),
        ".text-layer { position: absolute; top: 0; left: 0; right: 0; bottom: 0; }".to_string(),
        ".pdf-text { position: absolute; line-height: 1.2; white-space: pre; }".to_string(),
        ".pdf-image { position: absolute; }".to_string(),
        "</style>".to_string(),
        "</head><body>".to_string(),
    ];

    for page in pages {
        html.push(format!(
            "<div id=\"page-{}\" class=\"pdf-page\" style=\"width:{}px;height:{}px;\">",
            page.page_num,
            fmt_num(page.width),
            fmt_num(page.height)
        ));

        html.push("<div class=\"text-layer\">".to_string());
        for span in &page.spans {
            let pos = span.pixel_box(page.height);
            html.push(format!(
                "<div class=\"pdf-text\" style=\"left:{}px;top:{}px;font-size:{}px;color:{};\">{}</div>",
                fmt_num(pos.left),
                fmt_num(pos.top),
                fmt_num(span.font_size),
                span.css_color(),
                escape_html(&span.text)
            ));
        }
        html.push("</div>".to_string());

        for img in &page.images {
            html.push(format!(
                "<img class=\"pdf-image\" src=\"{}\" style=\"left:{}px;top:{}px;width:{}px;height:{}px;\">",
                img.data_url,
                fmt_num(img.left),
                fmt_num(img.top),
                fmt_num(img.width),
                fmt_num(img.height)
            ));
        }

        html.push("</div>".to_string());
    }

    html.push("</body></html>".to_string());
    html.concat()
}

/// Page rasters with a transparent, selectable text layer positioned in
/// percent so the page scales with the viewport.
pub fn render_overlay(title: &str, pages: &[PageContent], font_scale: f32) -> String {
    let mut html: Vec<String> = vec![
        "<!DOCTYPE html>".into(),
        "<html lang=\"en\">".into(),
        "<head>".into(),
        "  <meta charset=\"UTF-8\">".into(),
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">".into(),
        format!("  <title>{}</title>", escape_html(title)),
        "  <style>".into(),
        "    body { margin: 0; padding: 0; background-color: #f0f0f0; font-family: Arial, sans-serif; }".into(),
        "    .pdf-container { display: flex; flex-direction: column; align-items: center; }".into(),
        "    .pdf-page { position: relative; margin-bottom: 20px; box-shadow: 0 2px 5px rgba(0,0,0,0.2); background-color: white; }".into(),
        "    .page-image { width: 100%; height: auto; display: block; }".into(),
        "    .text-layer { position: absolute; top: 0; left: 0; right: 0; bottom: 0; overflow: hidden; opacity: 1; line-height: 1; }".into(),
        "    .text-element { position: absolute; white-space: pre; cursor: text; transform-origin: 0% 0%; pointer-events: all; color: transparent; }".into(),
        "    .text-element:hover { background-color: rgba(180, 0, 170, 0.2); }".into(),
        "  </style>".into(),
        "</head>".into(),
        "<body>".into(),
        "  <div class=\"pdf-container\">".into(),
    ];

    for page in pages {
        let n = page.page_num;
        html.push(format!(
            "    <div id=\"page-{n}\" class=\"pdf-page\" style=\"width: 100%; max-width: 1000px;\">"
        ));

        if let Some(ref raster) = page.raster {
            // Exact page box: the text layer is positioned in percent of it.
            let aspect = if page.width > 0.0 && page.height > 0.0 {
                format!("{} / {}", fmt_num(page.width), fmt_num(page.height))
            } else {
                "1".to_string()
            };
            html.push(format!(
                "      <img class=\"page-image\" src=\"{raster}\" alt=\"Page {n}\" style=\"aspect-ratio: {aspect};\">"
            ));
        }

        html.push("      <div class=\"text-layer\">".into());
        for span in &page.spans {
            let Some(pos) = span.percent_box(page.width, page.height) else {
                continue;
            };
            html.push(format!(
                "        <div class=\"text-element pdf-text\" style=\"left: {}%; top: {}%; width: {}%; height: {}%; font-size: {}px;\">{}</div>",
                fmt_num(pos.left),
                fmt_num(pos.top),
                fmt_num(pos.width),
                fmt_num(pos.height),
                fmt_num(span.font_size * font_scale),
                escape_html(&span.text)
            ));
        }
        html.push("      </div>".into());
        html.push("    </div>".into());
    }

    html.extend(
        [
            "  </div>",
            "  <script>",
            "    document.addEventListener(\"DOMContentLoaded\", function() {",
            "      const textElements = document.querySelectorAll(\".text-element\");",
            "      textElements.forEach(el => {",
            "        el.style.userSelect = \"text\";",
            "        el.style.cursor = \"text\";",
            "      });",
            "    });",
            "  </script>",
            "</body>",
            "</html>",
        ]
        .map(String::from),
    );

    html.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::render::PlacedImage;
    use crate::pipeline::text::TextSpan;

    fn sample_page() -> PageContent {
        PageContent {
            page_num: 1,
            width: 612.0,
            height: 792.0,
            spans: vec![TextSpan {
                text: "Tom & <Jerry>".into(),
                left: 72.0,
                bottom: 700.0,
                right: 172.0,
                top: 712.0,
                font_size: 12.0,
                color: [255, 0, 0],
            }],
            images: vec![PlacedImage {
                data_url: "data:image/jpeg;base64,AAAA".into(),
                left: 10.0,
                top: 20.0,
                width: 100.5,
                height: 50.0,
            }],
            raster: Some("data:image/png;base64,BBBB".into()),
        }
    }

    #[test]
    fn escape_covers_markup_characters() {
        assert_eq!(escape_html("a & b < c > \"d\""), "a &amp; b &lt; c &gt; &quot;d&quot;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn fmt_num_trims_zeros() {
        assert_eq!(fmt_num(612.0), "612");
        assert_eq!(fmt_num(10.5), "10.5");
        assert_eq!(fmt_num(1.0 / 3.0), "0.33");
        assert_eq!(fmt_num(-0.001), "0");
        assert_eq!(fmt_num(f32::NAN), "0");
    }

    #[test]
    fn native_places_text_in_pixels() {
        let html = render_native("Doc", &[sample_page()]);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Doc</title>"));
        assert!(html.contains("class=\"pdf-page\" style=\"width:612px;height:792px;\""));
        assert!(html.contains(
            "style=\"left:72px;top:80px;font-size:12px;color:#ff0000;\">Tom &amp; &lt;Jerry&gt;</div>"
        ));
        assert!(html.contains(
            "<img class=\"pdf-image\" src=\"data:image/jpeg;base64,AAAA\" style=\"left:10px;top:20px;width:100.5px;height:50px;\">"
        ));
        assert!(!html.contains("page-image"), "native output has no page raster");
        assert!(html.ends_with("</body></html>"));
    }

    #[test]
    fn overlay_uses_percentages_and_font_scale() {
        let html = render_overlay("Doc", &[sample_page()], 0.8);
        assert!(html.contains("<html lang=\"en\">"));
        assert!(html.contains("src=\"data:image/png;base64,BBBB\" alt=\"Page 1\""));
        assert!(html.contains("aspect-ratio: 612 / 792;"));
        assert!(html.contains(
            "style=\"left: 11.76%; top: 10.1%; width: 16.34%; height: 1.52%; font-size: 9.6px;\">Tom &amp; &lt;Jerry&gt;</div>"
        ));
        assert!(html.contains("DOMContentLoaded"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn overlay_aspect_ratio_is_the_exact_page_box() {
        let mut a4 = sample_page();
        a4.width = 595.28;
        a4.height = 841.89;
        let html = render_overlay("A4", &[a4], 0.8);
        assert!(html.contains("style=\"aspect-ratio: 595.28 / 841.89;\""));

        let mut degenerate = sample_page();
        degenerate.height = 0.0;
        let html = render_overlay("Empty", &[degenerate], 0.8);
        assert!(html.contains("style=\"aspect-ratio: 1;\""));
    }

    #[test]
    fn titles_are_escaped() {
        let html = render_overlay("<script>", &[], 0.8);
        assert!(html.contains("<title>&lt;script&gt;</title>"));
    }
}
