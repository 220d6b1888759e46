//! Rendering a [`SceneUnit`] as JavaScript or TypeScript.
//!
//! Both languages share the statement syntax; they differ in local
//! declarations, method signatures and the typed field list TypeScript
//! needs ahead of the methods.

use std::fmt::Write as _;

use tessel_model::settings::OutputLanguage;

use crate::builder::{SceneUnit, Stmt};

/// Language-specific spelling of a generated class.
pub trait Template {
    /// Keyword introducing a local binding.
    fn declare_keyword(&self) -> &'static str;

    /// Signature of a no-argument method, without the opening brace.
    fn method_signature(&self, name: &str) -> String;

    /// Field declarations placed at the start of the region.
    fn field_declarations(&self, unit: &SceneUnit) -> Vec<String>;
}

pub struct JavaScript;

pub struct TypeScript;

impl Template for JavaScript {
    fn declare_keyword(&self) -> &'static str {
        "var"
    }

    fn method_signature(&self, name: &str) -> String {
        format!("{name}()")
    }

    fn field_declarations(&self, _unit: &SceneUnit) -> Vec<String> {
        Vec::new()
    }
}

impl Template for TypeScript {
    fn declare_keyword(&self) -> &'static str {
        "const"
    }

    fn method_signature(&self, name: &str) -> String {
        format!("{name}(): void")
    }

    fn field_declarations(&self, unit: &SceneUnit) -> Vec<String> {
        unit.fields
            .iter()
            .map(|f| {
                let visibility = if f.public { "public" } else { "private" };
                format!("{visibility} {}: {};", f.name, f.type_name)
            })
            .collect()
    }
}

pub fn template_for(language: OutputLanguage) -> &'static dyn Template {
    match language {
        OutputLanguage::JavaScript => &JavaScript,
        OutputLanguage::TypeScript => &TypeScript,
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Text that goes strictly between the begin and end markers.
///
/// It opens with a newline and closes with the member indent, so the end
/// marker lines up with the begin marker.
pub fn render_region(template: &dyn Template, unit: &SceneUnit, indent: &str) -> String {
    let mut out = String::from("\n");

    let fields = template.field_declarations(unit);
    if !fields.is_empty() {
        for decl in fields {
            let _ = writeln!(out, "{indent}{decl}");
        }
        out.push('\n');
    }

    let methods = [
        ("init", &unit.init),
        ("preload", &unit.preload),
        ("create", &unit.create),
    ];
    for (i, (name, body)) in methods.into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "{indent}{} {{", template.method_signature(name));
        for stmt in body {
            render_stmt(&mut out, template, stmt, indent);
        }
        let _ = writeln!(out, "{indent}}}");
    }

    out.push_str(indent);
    out
}

fn render_stmt(out: &mut String, template: &dyn Template, stmt: &Stmt, indent: &str) {
    let _ = match stmt {
        Stmt::Declare { name, value } => writeln!(
            out,
            "{indent}{indent}{} {name} = {value};",
            template.declare_keyword()
        ),
        Stmt::Eval(expr) => writeln!(out, "{indent}{indent}{expr};"),
        Stmt::Assign { target, value } => writeln!(out, "{indent}{indent}{target} = {value};"),
        Stmt::Blank => writeln!(out),
    };
}

/// A whole new file around a region.
pub fn render_scaffold(
    unit: &SceneUnit,
    interior: &str,
    begin: &str,
    end: &str,
    indent: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// {} -- generated by tessel.", unit.class_name);
    let _ = writeln!(out, "// The generated region is rewritten on every save; edit around it.");
    out.push('\n');
    let _ = writeln!(out, "class {} extends {} {{", unit.class_name, unit.super_class);
    out.push('\n');
    let _ = writeln!(out, "{indent}constructor() {{");
    let _ = writeln!(out, "{indent}{indent}super();");
    let _ = writeln!(out, "{indent}}}");
    out.push('\n');
    let _ = writeln!(out, "{indent}{begin}{interior}{end}");
    out.push('\n');
    let _ = writeln!(out, "{indent}// user code here");
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use crate::builder::{Expr, Field};

    use super::*;

    fn unit() -> SceneUnit {
        SceneUnit {
            class_name: "Level".to_owned(),
            super_class: "Phaser.State".to_owned(),
            fields: vec![Field {
                name: "fHero".to_owned(),
                local: "hero".to_owned(),
                type_name: "Phaser.Sprite",
                public: true,
            }],
            init: Vec::new(),
            preload: Vec::new(),
            create: vec![
                Stmt::Declare {
                    name: "hero".to_owned(),
                    value: Expr::this_path(&["add", "sprite"]).call(vec![Expr::Number(1.0), Expr::Number(2.0)]),
                },
                Stmt::Assign {
                    target: Expr::This.member("fHero"),
                    value: Expr::ident("hero"),
                },
            ],
        }
    }

    #[test]
    fn javascript_region_layout() {
        let region = render_region(&JavaScript, &unit(), "  ");
        assert_eq!(
            region,
            "\n  init() {\n  }\n\n  preload() {\n  }\n\n  create() {\n    var hero = this.add.sprite(1, 2);\n    this.fHero = hero;\n  }\n  "
        );
    }

    #[test]
    fn typescript_declares_typed_fields() {
        let region = render_region(&TypeScript, &unit(), "\t");
        assert!(region.starts_with("\n\tpublic fHero: Phaser.Sprite;\n\n\tinit(): void {\n"));
        assert!(region.contains("\t\tconst hero = this.add.sprite(1, 2);\n"));
    }
}
