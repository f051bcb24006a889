//! SVG to JSX conversion.

use std::fmt::Write as _;

use anyhow::{Context, Result, bail};
use convert_case::{Case, Casing as _};
use roxmltree::{Document, Node};

use crate::app::source::MarkupTransformer;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const INDENT: &str = "  ";

/// Converts SVG documents into JSX elements that forward component props to the root `<svg>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgJsx;

impl SvgJsx {
    pub fn new() -> Self {
        Self
    }
}

impl MarkupTransformer for SvgJsx {
    fn transform(&self, raw: &str) -> Result<String> {
        let document = Document::parse(raw.trim_start_matches('\u{feff}'))
            .context("asset is not well-formed SVG")?;
        let root = document.root_element();
        if root.tag_name().name() != "svg" {
            bail!("expected <svg> root element, found <{}>", root.tag_name().name());
        }

        let mut out = String::new();
        write_element(&mut out, root, 0, true);
        Ok(out)
    }
}

fn write_element(out: &mut String, node: Node<'_, '_>, depth: usize, is_root: bool) {
    let indent = INDENT.repeat(depth);
    let tag = node.tag_name().name();
    let _ = write!(out, "{indent}<{tag}");

    if is_root {
        for namespace in node.namespaces() {
            match namespace.name() {
                None => {
                    let _ = write!(out, " xmlns=\"{}\"", namespace.uri());
                }
                Some("xml") => {}
                Some(prefix) => {
                    let name = format!("xmlns-{prefix}").to_case(Case::Camel);
                    let _ = write!(out, " {name}=\"{}\"", namespace.uri());
                }
            }
        }
    }

    for attribute in node.attributes() {
        let prefix = attribute.namespace().and_then(|uri| {
            if uri == XML_NAMESPACE {
                Some("xml")
            } else {
                node.lookup_prefix(uri)
            }
        });
        let name = jsx_attribute_name(prefix, attribute.name());
        if name == "style" {
            let _ = write!(out, " style={{{}}}", style_object(attribute.value()));
        } else {
            let _ = write!(out, " {name}={}", attribute_value(attribute.value()));
        }
    }

    if is_root {
        out.push_str(" {...props}");
    }

    let children: Vec<Node<'_, '_>> = node
        .children()
        .filter(|child| {
            child.is_element() || (child.is_text() && !child.text().unwrap_or("").trim().is_empty())
        })
        .collect();

    if children.is_empty() {
        out.push_str(" />\n");
        return;
    }

    out.push_str(">\n");
    for child in children {
        if child.is_element() {
            write_element(out, child, depth + 1, false);
        } else if let Some(text) = child.text() {
            let _ = writeln!(out, "{indent}{INDENT}{}", jsx_text(text.trim()));
        }
    }
    let _ = writeln!(out, "{indent}</{tag}>");
}

/// React spelling of an SVG attribute.
pub fn jsx_attribute_name(prefix: Option<&str>, local: &str) -> String {
    match (prefix, local) {
        (None, "class") => "className".to_owned(),
        (None, "for") => "htmlFor".to_owned(),
        (None, name) if name.starts_with("data-") || name.starts_with("aria-") => name.to_owned(),
        (Some(prefix), name) => format!("{prefix}-{name}").to_case(Case::Camel),
        (None, name) if name.contains('-') => name.to_case(Case::Camel),
        (None, name) => name.to_owned(),
    }
}

fn attribute_value(value: &str) -> String {
    if value.contains('"') {
        format!("{{{}}}", json_string(value))
    } else {
        format!("\"{value}\"")
    }
}

fn style_object(style: &str) -> String {
    let properties: Vec<String> = style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim();
            if property.is_empty() {
                return None;
            }
            let key = if property.starts_with("--") {
                json_string(property)
            } else {
                property.to_case(Case::Camel)
            };
            Some(format!("{key}: {}", json_string(value.trim())))
        })
        .collect();

    if properties.is_empty() {
        "{}".to_owned()
    } else {
        format!("{{ {} }}", properties.join(", "))
    }
}

fn jsx_text(text: &str) -> String {
    if text.contains(['{', '}', '<', '>']) {
        format!("{{{}}}", json_string(text))
    } else {
        text.to_owned()
    }
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform(svg: &str) -> String {
        SvgJsx::new().transform(svg).expect("svg converts")
    }

    #[test]
    fn converts_attributes_and_spreads_props() {
        let jsx = transform(
            r##"<?xml version="1.0"?>
<svg width="24" height="24" viewBox="0 0 24 24" fill="none" xmlns="http://www.w3.org/2000/svg">
<!-- exported -->
<path d="M1 1h22" stroke="#000" stroke-width="2" fill-rule="evenodd" class="line"/>
</svg>"##,
        );

        assert_eq!(
            jsx,
            concat!(
                "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"24\" height=\"24\" viewBox=\"0 0 24 24\" fill=\"none\" {...props}>\n",
                "  <path d=\"M1 1h22\" stroke=\"#000\" strokeWidth=\"2\" fillRule=\"evenodd\" className=\"line\" />\n",
                "</svg>\n"
            )
        );
    }

    #[test]
    fn converts_namespaced_attributes() {
        let jsx = transform(
            r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a" xml:space="preserve"/></svg>"##,
        );
        assert!(jsx.contains("xmlnsXlink=\"http://www.w3.org/1999/xlink\""));
        assert!(jsx.contains("<use xlinkHref=\"#a\" xmlSpace=\"preserve\" />"));
    }

    #[test]
    fn converts_inline_style_to_object() {
        let jsx = transform(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><mask style="mask-type: alpha; opacity:0.5"/></svg>"#,
        );
        assert!(jsx.contains(r#"<mask style={{ maskType: "alpha", opacity: "0.5" }} />"#));
    }

    #[test]
    fn keeps_data_and_aria_attributes() {
        assert_eq!(jsx_attribute_name(None, "data-name"), "data-name");
        assert_eq!(jsx_attribute_name(None, "aria-hidden"), "aria-hidden");
        assert_eq!(jsx_attribute_name(None, "clip-path"), "clipPath");
        assert_eq!(jsx_attribute_name(None, "viewBox"), "viewBox");
    }

    #[test]
    fn escapes_braces_in_text() {
        let jsx = transform(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><text>{x}</text></svg>"#,
        );
        assert!(jsx.contains(r#"{"{x}"}"#));
    }

    #[test]
    fn rejects_non_svg_markup() {
        assert!(SvgJsx::new().transform("<html></html>").is_err());
        assert!(SvgJsx::new().transform("<svg").is_err());
    }
}
