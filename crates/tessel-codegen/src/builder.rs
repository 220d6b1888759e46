//! Document -> language-neutral statement tree.
//!
//! [`build`] walks the world in child order and produces a [`SceneUnit`]:
//! the statements of the generated `init`, `preload` and `create` methods
//! plus the class fields. Templates only decide how the unit is spelled.
//!
//! Per entity with `editor.generate` set, `create` receives:
//!
//! 1. the construction call (`this.add.sprite(...)` etc.), with the parent
//!    group's local as the last argument for nested objects,
//! 2. assignments for properties that differ from their Phaser defaults,
//! 3. arcade physics setup when a body is attached.
//!
//! The construction result is bound to a local only when a later statement
//! needs it. Field assignments (`this.fName = name;`) follow all objects.
//! A group with `generate` unset is skipped together with its subtree.

use std::collections::HashSet;
use std::fmt;

use tessel_model::asset::AssetRef;
use tessel_model::body::{BodyShape, BodySize, PhysicsBody};
use tessel_model::document::Document;
use tessel_model::entity::EntityId;
use tessel_model::object::{Entity, ObjectKind};

// ---------------------------------------------------------------------------
// IR
// ---------------------------------------------------------------------------

/// An expression in the shared JavaScript/TypeScript subset we emit.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    This,
    Ident(String),
    Member(Box<Expr>, String),
    Call(Box<Expr>, Vec<Expr>),
    Binary(Box<Expr>, &'static str, Box<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    /// `this.a.b.c`
    pub fn this_path(path: &[&str]) -> Self {
        path.iter().fold(Expr::This, |acc, p| acc.member(*p))
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member(Box::new(self), name.into())
    }

    pub fn call(self, args: Vec<Expr>) -> Self {
        Expr::Call(Box::new(self), args)
    }

    fn optional_str(value: Option<&str>) -> Self {
        value.map_or(Expr::Null, |s| Expr::Str(s.to_owned()))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(v) => f.write_str(&js_number(*v)),
            Expr::Str(s) => f.write_str(&js_string(s)),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Null => f.write_str("null"),
            Expr::This => f.write_str("this"),
            Expr::Ident(name) => f.write_str(name),
            Expr::Member(target, name) => write!(f, "{target}.{name}"),
            Expr::Call(callee, args) => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Binary(lhs, op, rhs) => write!(f, "{lhs} {op} {rhs}"),
        }
    }
}

/// One statement of a generated method body.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Bind `value` to a new local.
    Declare { name: String, value: Expr },
    /// Evaluate for side effects.
    Eval(Expr),
    Assign { target: Expr, value: Expr },
    /// Empty separator line.
    Blank,
}

/// A class field holding a generated object.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name, e.g. `fHero`.
    pub name: String,
    /// Local the field is assigned from.
    pub local: String,
    /// Phaser class of the object, used for typed declarations.
    pub type_name: &'static str,
    pub public: bool,
}

/// Everything a template needs to render the generated region.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneUnit {
    pub class_name: String,
    pub super_class: String,
    pub fields: Vec<Field>,
    pub init: Vec<Stmt>,
    pub preload: Vec<Stmt>,
    pub create: Vec<Stmt>,
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Project `doc` into a [`SceneUnit`] for a class called `class_name`.
pub fn build(doc: &Document, class_name: &str) -> SceneUnit {
    let mut builder = Builder {
        doc,
        locals: HashSet::new(),
        field_names: HashSet::new(),
        packs: Vec::new(),
        fields: Vec::new(),
        create: Vec::new(),
        uses_physics: false,
    };

    if let Ok(children) = doc.children(doc.root_id()) {
        for child in children {
            builder.object(child, None);
        }
    }

    let Builder {
        packs,
        fields,
        mut create,
        uses_physics,
        ..
    } = builder;

    if !fields.is_empty() {
        for field in &fields {
            create.push(Stmt::Assign {
                target: Expr::This.member(field.name.clone()),
                value: Expr::ident(field.local.clone()),
            });
        }
    } else if matches!(create.last(), Some(Stmt::Blank)) {
        create.pop();
    }

    let settings = doc.settings();
    let mut init = vec![Stmt::Assign {
        target: Expr::this_path(&["stage", "backgroundColor"]),
        value: Expr::Str(settings.background_color.clone()),
    }];
    if uses_physics {
        init.push(Stmt::Eval(Expr::this_path(&["game", "physics", "startSystem"]).call(vec![
            Expr::ident("Phaser").member("Physics").member("ARCADE"),
        ])));
    }

    let preload = packs
        .into_iter()
        .map(|(section, pack)| {
            Stmt::Eval(
                Expr::this_path(&["load", "pack"]).call(vec![Expr::Str(section), Expr::Str(pack)]),
            )
        })
        .collect();

    SceneUnit {
        class_name: identifier(class_name),
        super_class: settings.super_class.clone(),
        fields,
        init,
        preload,
        create,
    }
}

struct Builder<'a> {
    doc: &'a Document,
    locals: HashSet<String>,
    /// Field names are deduplicated on their own: `hero` and `Hero` are
    /// distinct locals but would both capitalize to `fHero`.
    field_names: HashSet<String>,
    /// Distinct (section, pack) pairs in order of first use.
    packs: Vec<(String, String)>,
    fields: Vec<Field>,
    create: Vec<Stmt>,
    uses_physics: bool,
}

impl Builder<'_> {
    fn object(&mut self, id: &EntityId, parent: Option<&str>) {
        let doc = self.doc;
        let Some(entity) = doc.find(id) else {
            return;
        };
        if !entity.editor.generate {
            return;
        }

        let local = self.unique_local(&entity.editor.name);
        let construct = self.construction(entity, parent);
        let mut props = Vec::new();
        properties(entity, &local, &mut props);
        if let Some(body) = entity.kind.body() {
            self.uses_physics = true;
            physics(body, &local, &mut props);
        }

        let generated_children: Vec<&EntityId> = entity
            .kind
            .children()
            .unwrap_or(&[])
            .iter()
            .filter(|c| doc.find(c).is_some_and(|e| e.editor.generate))
            .collect();

        let is_field = entity.editor.is_field();
        let needs_local = is_field || !props.is_empty() || !generated_children.is_empty();

        if needs_local {
            self.create.push(Stmt::Declare {
                name: local.clone(),
                value: construct,
            });
        } else {
            self.create.push(Stmt::Eval(construct));
        }
        self.create.extend(props);
        self.create.push(Stmt::Blank);

        if is_field {
            let field_name = self.unique_field(&local);
            self.fields.push(Field {
                name: field_name,
                local: local.clone(),
                type_name: phaser_class(&entity.kind),
                public: entity.editor.public,
            });
        }

        for child in generated_children {
            self.object(child, Some(&local));
        }
    }

    fn construction(&mut self, entity: &Entity, parent: Option<&str>) -> Expr {
        let t = &entity.transform;
        let parent = parent.map_or(Expr::Null, Expr::ident);
        let texture = entity.kind.texture();
        if let Some(asset) = texture {
            self.use_pack(asset);
        }
        let key = Expr::optional_str(texture.map(|a| a.key.as_str()));
        let frame = Expr::optional_str(texture.and_then(|a| a.frame.as_deref()));

        let (method, args) = match &entity.kind {
            ObjectKind::Group(_) => ("group", vec![parent]),
            ObjectKind::Sprite(_) => (
                "sprite",
                vec![Expr::Number(t.x), Expr::Number(t.y), key, frame, parent],
            ),
            ObjectKind::TileSprite(d) => (
                "tileSprite",
                vec![
                    Expr::Number(t.x),
                    Expr::Number(t.y),
                    Expr::Number(d.width),
                    Expr::Number(d.height),
                    key,
                    frame,
                    parent,
                ],
            ),
            ObjectKind::Button(d) => {
                let (callback, context) = match &d.callback {
                    Some(name) => (Expr::This.member(identifier(name)), Expr::This),
                    None => (Expr::Null, Expr::Null),
                };
                (
                    "button",
                    vec![
                        Expr::Number(t.x),
                        Expr::Number(t.y),
                        key,
                        callback,
                        context,
                        Expr::optional_str(d.frames.over.as_deref()),
                        Expr::optional_str(d.frames.out.as_deref()),
                        Expr::optional_str(d.frames.down.as_deref()),
                        Expr::optional_str(d.frames.up.as_deref()),
                        parent,
                    ],
                )
            }
        };
        Expr::this_path(&["add", method]).call(trim_trailing_nulls(args))
    }

    fn use_pack(&mut self, asset: &AssetRef) {
        let pair = (asset.section.clone(), asset.pack.clone());
        if !self.packs.contains(&pair) {
            self.packs.push(pair);
        }
    }

    fn unique_local(&mut self, name: &str) -> String {
        unique_in(&mut self.locals, identifier(name))
    }

    fn unique_field(&mut self, local: &str) -> String {
        unique_in(&mut self.field_names, field_name(local))
    }
}

/// `base`, or `base` with the first free numeric suffix, claimed in `taken`.
fn unique_in(taken: &mut HashSet<String>, base: String) -> String {
    let mut candidate = base.clone();
    let mut n = 1u32;
    while taken.contains(&candidate) {
        candidate = format!("{base}{n}");
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

/// Non-default transform, render and variant properties.
fn properties(entity: &Entity, local: &str, out: &mut Vec<Stmt>) {
    let obj = || Expr::ident(local);
    let set = |out: &mut Vec<Stmt>, prop: &str, value: Expr| {
        out.push(Stmt::Assign {
            target: obj().member(prop),
            value,
        });
    };
    let set_to = |out: &mut Vec<Stmt>, prop: &str, x: f64, y: f64| {
        out.push(Stmt::Eval(
            obj()
                .member(prop)
                .member("setTo")
                .call(vec![Expr::Number(x), Expr::Number(y)]),
        ));
    };

    let t = &entity.transform;
    if entity.is_group() && (t.x != 0.0 || t.y != 0.0) {
        set_to(out, "position", t.x, t.y);
    }
    if t.angle != 0.0 {
        set(out, "angle", Expr::Number(t.angle));
    }
    if t.scale_x != 1.0 || t.scale_y != 1.0 {
        set_to(out, "scale", t.scale_x, t.scale_y);
    }
    if t.pivot_x != 0.0 || t.pivot_y != 0.0 {
        set_to(out, "pivot", t.pivot_x, t.pivot_y);
    }

    let r = &entity.render;
    if r.alpha != 1.0 {
        set(out, "alpha", Expr::Number(r.alpha));
    }
    if !r.visible {
        set(out, "visible", Expr::Bool(false));
    }
    if r.fixed_to_camera {
        set(out, "fixedToCamera", Expr::Bool(true));
    }

    if let ObjectKind::TileSprite(d) = &entity.kind {
        if d.tile_position_x != 0.0 || d.tile_position_y != 0.0 {
            set_to(out, "tilePosition", d.tile_position_x, d.tile_position_y);
        }
        if d.tile_scale_x != 1.0 || d.tile_scale_y != 1.0 {
            set_to(out, "tileScale", d.tile_scale_x, d.tile_scale_y);
        }
    }
}

/// Arcade physics setup. `Auto` sizes use the object's own dimensions.
fn physics(body: &PhysicsBody, local: &str, out: &mut Vec<Stmt>) {
    let obj = || Expr::ident(local);
    let size = |value: BodySize, natural: &str| match value {
        BodySize::Fixed(v) => Expr::Number(v),
        BodySize::Auto => obj().member(natural),
    };
    let offsets = || vec![Expr::Number(body.offset_x), Expr::Number(body.offset_y)];

    out.push(Stmt::Eval(
        Expr::this_path(&["game", "physics", "arcade", "enable"]).call(vec![obj()]),
    ));

    match &body.shape {
        &BodyShape::Rect { width, height } => {
            let customized = !width.is_auto()
                || !height.is_auto()
                || body.offset_x != 0.0
                || body.offset_y != 0.0;
            if customized {
                let mut args = vec![size(width, "width"), size(height, "height")];
                args.extend(offsets());
                out.push(Stmt::Eval(obj().member("body").member("setSize").call(args)));
            }
        }
        &BodyShape::Circle { radius } => {
            let radius = match radius {
                BodySize::Fixed(v) => Expr::Number(v),
                BodySize::Auto => Expr::Binary(
                    Box::new(obj().member("width")),
                    "/",
                    Box::new(Expr::Number(2.0)),
                ),
            };
            let mut args = vec![radius];
            args.extend(offsets());
            out.push(Stmt::Eval(obj().member("body").member("setCircle").call(args)));
        }
    }

    let mut flag = |prop: &str, value: Expr| {
        out.push(Stmt::Assign {
            target: obj().member("body").member(prop),
            value,
        });
    };
    if body.mass != 1.0 {
        flag("mass", Expr::Number(body.mass));
    }
    if !body.moves {
        flag("moves", Expr::Bool(false));
    }
    if body.immovable {
        flag("immovable", Expr::Bool(true));
    }
    if body.collide_world_bounds {
        flag("collideWorldBounds", Expr::Bool(true));
    }
    if !body.allow_rotation {
        flag("allowRotation", Expr::Bool(false));
    }
    if !body.allow_gravity {
        flag("allowGravity", Expr::Bool(false));
    }
}

fn trim_trailing_nulls(mut args: Vec<Expr>) -> Vec<Expr> {
    while matches!(args.last(), Some(Expr::Null)) {
        args.pop();
    }
    args
}

fn phaser_class(kind: &ObjectKind) -> &'static str {
    match kind {
        ObjectKind::Group(_) => "Phaser.Group",
        ObjectKind::Sprite(_) => "Phaser.Sprite",
        ObjectKind::TileSprite(_) => "Phaser.TileSprite",
        ObjectKind::Button(_) => "Phaser.Button",
    }
}

// ---------------------------------------------------------------------------
// Lexical helpers
// ---------------------------------------------------------------------------

const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "super", "switch",
    "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// A valid JavaScript identifier derived from a display name.
pub fn identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.is_empty() {
        out.push_str("obj");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if RESERVED.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

/// `hero` -> `fHero`.
pub fn field_name(local: &str) -> String {
    let mut chars = local.chars();
    match chars.next() {
        Some(first) => format!("f{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "f".to_owned(),
    }
}

fn js_number(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_owned();
    }
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Single-quoted literal. Comment delimiters are broken up so string content
/// can never be mistaken for a region marker.
fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    let mut prev = '\0';
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '/' if prev == '*' => out.push_str("\\/"),
            '*' if prev == '/' => out.push_str("\\*"),
            _ => out.push(c),
        }
        prev = c;
    }
    out.push('\'');
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
