//! A local, declaration-directed type resolver. It answers the questions
//! the rules ask of a type checker — the kind of an integer expression,
//! whether an operand's underlying type is a map or a slice, which
//! positions of a call's result tuple carry an `error` — by resolving
//! identifiers to their declaration sites and reading the declared or
//! inferred types off the syntax tree.

use std::fmt;

use tree_sitter::Node;

use crate::loader::{Package, ParsedFile};

const MAX_RESOLVE_DEPTH: u8 = 12;

/// Go's integer kinds. `Int` and `Uint` take the host word size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
}

impl IntKind {
    pub fn from_name(name: &str) -> Option<IntKind> {
        let kind = match name {
            "int" => IntKind::Int,
            "int8" => IntKind::Int8,
            "int16" => IntKind::Int16,
            "int32" | "rune" => IntKind::Int32,
            "int64" => IntKind::Int64,
            "uint" => IntKind::Uint,
            "uint8" | "byte" => IntKind::Uint8,
            "uint16" => IntKind::Uint16,
            "uint32" => IntKind::Uint32,
            "uint64" | "uintptr" => IntKind::Uint64,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            IntKind::Int | IntKind::Int8 | IntKind::Int16 | IntKind::Int32 | IntKind::Int64
        )
    }

    /// Bit width on the given host.
    pub fn width(self, is_32bit: bool) -> u8 {
        match self {
            IntKind::Int8 | IntKind::Uint8 => 8,
            IntKind::Int16 | IntKind::Uint16 => 16,
            IntKind::Int32 | IntKind::Uint32 => 32,
            IntKind::Int64 | IntKind::Uint64 => 64,
            IntKind::Int | IntKind::Uint => {
                if is_32bit {
                    32
                } else {
                    64
                }
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntKind::Int => "int",
            IntKind::Int8 => "int8",
            IntKind::Int16 => "int16",
            IntKind::Int32 => "int32",
            IntKind::Int64 => "int64",
            IntKind::Uint => "uint",
            IntKind::Uint8 => "uint8",
            IntKind::Uint16 => "uint16",
            IntKind::Uint32 => "uint32",
            IntKind::Uint64 => "uint64",
        }
    }
}

/// The subset of Go's type structure the rules care about.
#[derive(Debug, Clone, PartialEq)]
pub enum GoType {
    Int(IntKind),
    Float,
    String,
    Bool,
    Map(Box<GoType>, Box<GoType>),
    Slice(Box<GoType>),
    Array(Box<GoType>),
    Pointer(Box<GoType>),
    Chan,
    Func,
    Struct,
    Interface,
    Error,
    Named(String),
    Qualified(String, String),
    Tuple(Vec<GoType>),
    Unknown,
}

impl GoType {
    pub fn is_known(&self) -> bool {
        !matches!(self, GoType::Unknown)
    }
}

impl fmt::Display for GoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoType::Int(kind) => f.write_str(kind.name()),
            GoType::Float => f.write_str("float"),
            GoType::String => f.write_str("string"),
            GoType::Bool => f.write_str("bool"),
            GoType::Map(k, v) => write!(f, "map[{k}]{v}"),
            GoType::Slice(e) => write!(f, "[]{e}"),
            GoType::Array(e) => write!(f, "[...]{e}"),
            GoType::Pointer(e) => write!(f, "*{e}"),
            GoType::Chan => f.write_str("chan"),
            GoType::Func => f.write_str("func"),
            GoType::Struct => f.write_str("struct"),
            GoType::Interface => f.write_str("interface"),
            GoType::Error => f.write_str("error"),
            GoType::Named(name) => f.write_str(name),
            GoType::Qualified(pkg, name) => write!(f, "{pkg}.{name}"),
            GoType::Tuple(_) => f.write_str("tuple"),
            GoType::Unknown => f.write_str("unknown"),
        }
    }
}

/// Where an identifier was declared.
pub struct Declaration<'a> {
    pub site: Node<'a>,
    pub kind: DeclKind<'a>,
}

pub enum DeclKind<'a> {
    ShortVar { stmt: Node<'a>, index: usize },
    VarSpec { spec: Node<'a>, index: usize },
    ConstSpec { spec: Node<'a>, index: usize },
    Param { type_node: Option<Node<'a>> },
    RangeKey { clause: Node<'a> },
    RangeValue { clause: Node<'a> },
    Func,
    TypeSpec { spec: Node<'a> },
}

impl Declaration<'_> {
    /// Declaration-site identity: two identifiers denote the same object
    /// when their declarations share this id.
    pub fn id(&self) -> usize {
        self.site.id()
    }
}

pub struct TypeResolver<'a> {
    pkg: &'a Package,
    file: &'a ParsedFile,
}

impl<'a> TypeResolver<'a> {
    pub fn new(pkg: &'a Package, file: &'a ParsedFile) -> Self {
        TypeResolver { pkg, file }
    }

    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.file.source.as_bytes()).unwrap_or("")
    }

    /// Resolves an identifier use to its declaration, scanning enclosing
    /// scopes innermost-first. The blank identifier never resolves.
    pub fn resolve(&self, ident: Node<'a>) -> Option<Declaration<'a>> {
        let name = self.text(ident);
        if name.is_empty() || name == "_" {
            return None;
        }

        let mut current = ident;
        while let Some(parent) = current.parent() {
            if let Some(decl) = self.scope_lookup(parent, ident, name) {
                return Some(decl);
            }
            current = parent;
        }
        None
    }

    /// Do two identifiers resolve to the same declaration site?
    pub fn same_object(&self, a: Node<'a>, b: Node<'a>) -> bool {
        match (self.resolve(a), self.resolve(b)) {
            (Some(da), Some(db)) => da.id() == db.id(),
            _ => false,
        }
    }

    fn scope_lookup(
        &self,
        scope: Node<'a>,
        usage: Node<'a>,
        name: &str,
    ) -> Option<Declaration<'a>> {
        match scope.kind() {
            "block" | "source_file" => {
                let package_level = scope.kind() == "source_file";
                let mut found = None;
                let mut cursor = scope.walk();
                for stmt in scope.children(&mut cursor) {
                    if !package_level && stmt.start_byte() > usage.start_byte() {
                        break;
                    }
                    if let Some(decl) = self.declaration_in(stmt, name) {
                        found = Some(decl);
                    }
                }
                if found.is_none() && package_level {
                    return self.package_lookup(name);
                }
                found
            }
            "function_declaration" | "method_declaration" | "func_literal" => {
                for field in ["parameters", "receiver", "result"] {
                    if let Some(list) = scope.child_by_field_name(field) {
                        if let Some(decl) = self.param_lookup(list, name) {
                            return Some(decl);
                        }
                    }
                }
                None
            }
            "for_statement" => {
                let mut cursor = scope.walk();
                for clause in scope.children(&mut cursor) {
                    match clause.kind() {
                        "range_clause" => {
                            if let Some(decl) = self.range_lookup(clause, name) {
                                return Some(decl);
                            }
                        }
                        "for_clause" => {
                            if let Some(init) = clause.child_by_field_name("initializer") {
                                if let Some(decl) = self.declaration_in(init, name) {
                                    return Some(decl);
                                }
                            }
                        }
                        _ => {}
                    }
                }
                None
            }
            "if_statement" => scope
                .child_by_field_name("initializer")
                .and_then(|init| self.declaration_in(init, name)),
            _ => None,
        }
    }

    /// Package-level declarations in the other files of the package.
    fn package_lookup(&self, name: &str) -> Option<Declaration<'a>> {
        for file in &self.pkg.files {
            if std::ptr::eq(file, self.file) {
                continue;
            }
            let root = file.tree.root_node();
            let mut cursor = root.walk();
            for stmt in root.children(&mut cursor) {
                if let Some(decl) = declaration_in_file(stmt, name, &file.source) {
                    return Some(decl);
                }
            }
        }
        None
    }

    fn declaration_in(&self, stmt: Node<'a>, name: &str) -> Option<Declaration<'a>> {
        declaration_in_file(stmt, name, &self.file.source)
    }

    fn param_lookup(&self, node: Node<'a>, name: &str) -> Option<Declaration<'a>> {
        let mut cursor = node.walk();
        for decl in node.children(&mut cursor) {
            if decl.kind() != "parameter_declaration" && decl.kind() != "variadic_parameter_declaration"
            {
                continue;
            }
            let type_node = decl.child_by_field_name("type");
            let mut names = decl.walk();
            for child in decl.children(&mut names) {
                if child.kind() == "identifier" && self.text(child) == name {
                    return Some(Declaration {
                        site: child,
                        kind: DeclKind::Param { type_node },
                    });
                }
            }
        }
        None
    }

    fn range_lookup(&self, clause: Node<'a>, name: &str) -> Option<Declaration<'a>> {
        let left = clause.child_by_field_name("left")?;
        let mut cursor = left.walk();
        for (index, child) in left.named_children(&mut cursor).enumerate() {
            if child.kind() == "identifier" && self.text(child) == name {
                let kind = if index == 0 {
                    DeclKind::RangeKey { clause }
                } else {
                    DeclKind::RangeValue { clause }
                };
                return Some(Declaration { site: child, kind });
            }
        }
        None
    }

    /// The type of an expression node of the current file.
    pub fn type_of(&self, expr: Node<'a>) -> GoType {
        self.type_of_at(expr, 0)
    }

    fn type_of_at(&self, expr: Node<'a>, depth: u8) -> GoType {
        if depth > MAX_RESOLVE_DEPTH {
            return GoType::Unknown;
        }
        match expr.kind() {
            "int_literal" => GoType::Int(IntKind::Int),
            "float_literal" => GoType::Float,
            "interpreted_string_literal" | "raw_string_literal" => GoType::String,
            "rune_literal" => GoType::Int(IntKind::Int32),
            "true" | "false" => GoType::Bool,
            "nil" => GoType::Unknown,
            "identifier" => self.type_of_ident(expr, depth),
            "parenthesized_expression" => match expr.named_child(0) {
                Some(inner) => self.type_of_at(inner, depth + 1),
                None => GoType::Unknown,
            },
            "unary_expression" => self.type_of_unary(expr, depth),
            "binary_expression" => self.type_of_binary(expr, depth),
            "call_expression" => match self.call_result_types(expr, depth) {
                Some(mut results) if results.len() == 1 => results.pop().unwrap(),
                Some(results) if results.len() > 1 => GoType::Tuple(results),
                _ => GoType::Unknown,
            },
            "composite_literal" => expr
                .child_by_field_name("type")
                .map(|t| self.type_from_type_node(t, depth))
                .unwrap_or(GoType::Unknown),
            "index_expression" => {
                let Some(operand) = expr.child_by_field_name("operand") else {
                    return GoType::Unknown;
                };
                match self.underlying_at(self.type_of_at(operand, depth + 1), depth) {
                    GoType::Map(_, value) => *value,
                    GoType::Slice(elem) | GoType::Array(elem) => *elem,
                    GoType::String => GoType::Int(IntKind::Uint8),
                    _ => GoType::Unknown,
                }
            }
            "type_conversion_expression" => expr
                .child_by_field_name("type")
                .map(|t| self.type_from_type_node(t, depth))
                .unwrap_or(GoType::Unknown),
            _ => GoType::Unknown,
        }
    }

    fn type_of_ident(&self, ident: Node<'a>, depth: u8) -> GoType {
        match self.text(ident) {
            "true" | "false" => return GoType::Bool,
            _ => {}
        }
        let Some(decl) = self.resolve(ident) else {
            return GoType::Unknown;
        };
        self.type_of_decl(&decl, depth)
    }

    fn type_of_decl(&self, decl: &Declaration<'a>, depth: u8) -> GoType {
        match &decl.kind {
            DeclKind::ShortVar { stmt, index } => {
                let Some(right) = stmt.child_by_field_name("right") else {
                    return GoType::Unknown;
                };
                let values = named_children_of(right);
                if (values.len() == 1 && *index > 0) || values.is_empty() {
                    // Multi-value form: x, y := f()
                    let Some(first) = values.first() else {
                        return GoType::Unknown;
                    };
                    return match self.type_of_at(*first, depth + 1) {
                        GoType::Tuple(mut results) if *index < results.len() => {
                            results.swap_remove(*index)
                        }
                        _ => GoType::Unknown,
                    };
                }
                match values.get(*index) {
                    Some(value) => match self.type_of_at(*value, depth + 1) {
                        GoType::Tuple(mut results) if !results.is_empty() => results.swap_remove(0),
                        t => t,
                    },
                    None => GoType::Unknown,
                }
            }
            DeclKind::VarSpec { spec, index } | DeclKind::ConstSpec { spec, index } => {
                if let Some(type_node) = spec.child_by_field_name("type") {
                    return self.type_from_type_node(type_node, depth);
                }
                let Some(values) = spec.child_by_field_name("value") else {
                    return GoType::Unknown;
                };
                match named_children_of(values).get(*index) {
                    Some(value) => self.type_of_at(*value, depth + 1),
                    None => GoType::Unknown,
                }
            }
            DeclKind::Param { type_node } => match type_node {
                Some(t) => self.type_from_type_node(*t, depth),
                None => GoType::Unknown,
            },
            DeclKind::RangeKey { clause } => {
                match self.ranged_type(*clause, depth) {
                    GoType::Map(key, _) => *key,
                    GoType::Slice(_) | GoType::Array(_) | GoType::String => GoType::Int(IntKind::Int),
                    _ => GoType::Unknown,
                }
            }
            DeclKind::RangeValue { clause } => match self.ranged_type(*clause, depth) {
                GoType::Map(_, value) => *value,
                GoType::Slice(elem) | GoType::Array(elem) => *elem,
                GoType::String => GoType::Int(IntKind::Int32),
                _ => GoType::Unknown,
            },
            DeclKind::Func => GoType::Func,
            DeclKind::TypeSpec { spec } => {
                let name = spec
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default();
                GoType::Named(name)
            }
        }
    }

    fn ranged_type(&self, clause: Node<'a>, depth: u8) -> GoType {
        let Some(right) = clause.child_by_field_name("right") else {
            return GoType::Unknown;
        };
        self.underlying_at(self.type_of_at(right, depth + 1), depth)
    }

    fn type_of_unary(&self, expr: Node<'a>, depth: u8) -> GoType {
        let Some(operand) = expr.child_by_field_name("operand") else {
            return GoType::Unknown;
        };
        let operator = expr
            .child_by_field_name("operator")
            .map(|op| self.text(op))
            .unwrap_or("");
        match operator {
            "&" => GoType::Pointer(Box::new(self.type_of_at(operand, depth + 1))),
            "!" => GoType::Bool,
            "*" => match self.type_of_at(operand, depth + 1) {
                GoType::Pointer(inner) => *inner,
                _ => GoType::Unknown,
            },
            _ => self.type_of_at(operand, depth + 1),
        }
    }

    fn type_of_binary(&self, expr: Node<'a>, depth: u8) -> GoType {
        let operator = expr
            .child_by_field_name("operator")
            .map(|op| self.text(op))
            .unwrap_or("");
        if matches!(operator, "==" | "!=" | "<" | "<=" | ">" | ">=" | "&&" | "||") {
            return GoType::Bool;
        }
        match expr.child_by_field_name("left") {
            Some(left) => self.type_of_at(left, depth + 1),
            None => GoType::Unknown,
        }
    }

    /// The result types of a call expression, when the callee is known:
    /// builtins, conversions, package-local functions and methods, and a
    /// fixed table of common standard-library signatures.
    pub fn call_results(&self, call: Node<'a>) -> Option<Vec<GoType>> {
        self.call_result_types(call, 0)
    }

    fn call_result_types(&self, call: Node<'a>, depth: u8) -> Option<Vec<GoType>> {
        if depth > MAX_RESOLVE_DEPTH {
            return None;
        }
        let function = call.child_by_field_name("function")?;
        match function.kind() {
            "identifier" => {
                let name = self.text(function);
                if let Some(kind) = IntKind::from_name(name) {
                    return Some(vec![GoType::Int(kind)]);
                }
                match name {
                    "len" | "cap" => return Some(vec![GoType::Int(IntKind::Int)]),
                    "make" => {
                        let arg = first_argument(call)?;
                        return Some(vec![self.type_from_type_node(arg, depth)]);
                    }
                    "append" => {
                        let arg = first_argument(call)?;
                        return Some(vec![self.type_of_at(arg, depth + 1)]);
                    }
                    "new" => {
                        let arg = first_argument(call)?;
                        return Some(vec![GoType::Pointer(Box::new(
                            self.type_from_type_node(arg, depth),
                        ))]);
                    }
                    "string" => return Some(vec![GoType::String]),
                    _ => {}
                }
                let (decl, source) = self.find_function(name)?;
                Some(result_types(decl, source, depth))
            }
            "selector_expression" => {
                let operand = function.child_by_field_name("operand")?;
                let field = function.child_by_field_name("field")?;
                let method = self.text(field);
                if operand.kind() == "identifier" && self.resolve(operand).is_none() {
                    // Not a local value, so treat the operand as a package
                    // qualifier and consult the signature table.
                    return stdlib_result_types(self.text(operand), method);
                }
                let (decl, source) = self.find_method(method)?;
                Some(result_types(decl, source, depth))
            }
            // Conversions to composite types, e.g. []byte(s).
            "slice_type" | "map_type" | "array_type" | "pointer_type" | "qualified_type" => {
                Some(vec![self.type_from_type_node(function, depth)])
            }
            _ => None,
        }
    }

    fn find_function(&self, name: &str) -> Option<(Node<'a>, &'a str)> {
        for file in &self.pkg.files {
            let root = file.tree.root_node();
            let mut cursor = root.walk();
            for child in root.children(&mut cursor) {
                if child.kind() == "function_declaration" {
                    let decl_name = child
                        .child_by_field_name("name")
                        .and_then(|n| n.utf8_text(file.source.as_bytes()).ok());
                    if decl_name == Some(name) {
                        return Some((child, &file.source));
                    }
                }
            }
        }
        None
    }

    /// A method declaration by bare name, accepted only when the package
    /// declares exactly one method of that name.
    fn find_method(&self, name: &str) -> Option<(Node<'a>, &'a str)> {
        let mut found = None;
        for file in &self.pkg.files {
            let root = file.tree.root_node();
            let mut cursor = root.walk();
            for child in root.children(&mut cursor) {
                if child.kind() == "method_declaration" {
                    let decl_name = child
                        .child_by_field_name("name")
                        .and_then(|n| n.utf8_text(file.source.as_bytes()).ok());
                    if decl_name == Some(name) {
                        if found.is_some() {
                            return None;
                        }
                        found = Some((child, &file.source as &str));
                    }
                }
            }
        }
        found
    }

    /// Converts a type node into a [`GoType`].
    pub fn type_from_type_node(&self, node: Node<'a>, depth: u8) -> GoType {
        type_from_node(node, &self.file.source, depth)
    }

    /// Resolves through package-local named types to the underlying type.
    pub fn underlying(&self, t: GoType) -> GoType {
        self.underlying_at(t, 0)
    }

    fn underlying_at(&self, t: GoType, depth: u8) -> GoType {
        if depth > MAX_RESOLVE_DEPTH {
            return GoType::Unknown;
        }
        match t {
            GoType::Named(name) => match self.find_type_spec(&name) {
                Some((type_node, source)) => {
                    let declared = type_from_node(type_node, source, depth + 1);
                    self.underlying_at(declared, depth + 1)
                }
                None => GoType::Unknown,
            },
            other => other,
        }
    }

    fn find_type_spec(&self, name: &str) -> Option<(Node<'a>, &'a str)> {
        for file in &self.pkg.files {
            let root = file.tree.root_node();
            let mut cursor = root.walk();
            for child in root.children(&mut cursor) {
                if child.kind() != "type_declaration" {
                    continue;
                }
                let mut specs = child.walk();
                for spec in child.children(&mut specs) {
                    if spec.kind() != "type_spec" {
                        continue;
                    }
                    let spec_name = spec
                        .child_by_field_name("name")
                        .and_then(|n| n.utf8_text(file.source.as_bytes()).ok());
                    if spec_name == Some(name) {
                        if let Some(type_node) = spec.child_by_field_name("type") {
                            return Some((type_node, &file.source));
                        }
                    }
                }
            }
        }
        None
    }
}

fn declaration_in_file<'a>(
    stmt: Node<'a>,
    name: &str,
    source: &str,
) -> Option<Declaration<'a>> {
    let text = |node: Node| node.utf8_text(source.as_bytes()).unwrap_or("");
    match stmt.kind() {
        "short_var_declaration" => {
            let left = stmt.child_by_field_name("left")?;
            let mut cursor = left.walk();
            for (index, child) in left.named_children(&mut cursor).enumerate() {
                if child.kind() == "identifier" && text(child) == name {
                    return Some(Declaration {
                        site: child,
                        kind: DeclKind::ShortVar { stmt, index },
                    });
                }
            }
            None
        }
        "var_declaration" | "const_declaration" => {
            let is_var = stmt.kind() == "var_declaration";
            let mut cursor = stmt.walk();
            for spec in stmt.children(&mut cursor) {
                if spec.kind() != "var_spec" && spec.kind() != "const_spec" {
                    continue;
                }
                let mut names = spec.walk();
                for (index, child) in spec
                    .children_by_field_name("name", &mut names)
                    .enumerate()
                {
                    if text(child) == name {
                        let kind = if is_var {
                            DeclKind::VarSpec { spec, index }
                        } else {
                            DeclKind::ConstSpec { spec, index }
                        };
                        return Some(Declaration { site: child, kind });
                    }
                }
            }
            None
        }
        "function_declaration" => {
            let name_node = stmt.child_by_field_name("name")?;
            if text(name_node) == name {
                return Some(Declaration {
                    site: name_node,
                    kind: DeclKind::Func,
                });
            }
            None
        }
        "type_declaration" => {
            let mut cursor = stmt.walk();
            for spec in stmt.children(&mut cursor) {
                if spec.kind() != "type_spec" {
                    continue;
                }
                let name_node = spec.child_by_field_name("name")?;
                if text(name_node) == name {
                    return Some(Declaration {
                        site: name_node,
                        kind: DeclKind::TypeSpec { spec },
                    });
                }
            }
            None
        }
        _ => None,
    }
}

fn type_from_node<'a>(node: Node<'a>, source: &str, depth: u8) -> GoType {
    if depth > MAX_RESOLVE_DEPTH {
        return GoType::Unknown;
    }
    let text = |node: Node| node.utf8_text(source.as_bytes()).unwrap_or("");
    match node.kind() {
        "type_identifier" => {
            let name = text(node);
            if let Some(kind) = IntKind::from_name(name) {
                return GoType::Int(kind);
            }
            match name {
                "string" => GoType::String,
                "bool" => GoType::Bool,
                "error" => GoType::Error,
                "float32" | "float64" | "complex64" | "complex128" => GoType::Float,
                _ => GoType::Named(name.to_string()),
            }
        }
        "map_type" => {
            let key = node
                .child_by_field_name("key")
                .map(|k| type_from_node(k, source, depth + 1))
                .unwrap_or(GoType::Unknown);
            let value = node
                .child_by_field_name("value")
                .map(|v| type_from_node(v, source, depth + 1))
                .unwrap_or(GoType::Unknown);
            GoType::Map(Box::new(key), Box::new(value))
        }
        "slice_type" => GoType::Slice(Box::new(
            node.child_by_field_name("element")
                .map(|e| type_from_node(e, source, depth + 1))
                .unwrap_or(GoType::Unknown),
        )),
        "array_type" => GoType::Array(Box::new(
            node.child_by_field_name("element")
                .map(|e| type_from_node(e, source, depth + 1))
                .unwrap_or(GoType::Unknown),
        )),
        "pointer_type" => GoType::Pointer(Box::new(
            node.named_child(0)
                .map(|e| type_from_node(e, source, depth + 1))
                .unwrap_or(GoType::Unknown),
        )),
        "qualified_type" => {
            let mut package = String::new();
            let mut name = String::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                match child.kind() {
                    "package_identifier" => package = text(child).to_string(),
                    "type_identifier" => name = text(child).to_string(),
                    _ => {}
                }
            }
            GoType::Qualified(package, name)
        }
        "struct_type" => GoType::Struct,
        "interface_type" => GoType::Interface,
        "function_type" => GoType::Func,
        "channel_type" => GoType::Chan,
        "parenthesized_type" => node
            .named_child(0)
            .map(|inner| type_from_node(inner, source, depth + 1))
            .unwrap_or(GoType::Unknown),
        _ => GoType::Unknown,
    }
}

/// Flattens a function declaration's results into a type list.
fn result_types(decl: Node, source: &str, depth: u8) -> Vec<GoType> {
    let Some(result) = decl.child_by_field_name("result") else {
        return Vec::new();
    };
    if result.kind() != "parameter_list" {
        return vec![type_from_node(result, source, depth + 1)];
    }
    let mut out = Vec::new();
    let mut cursor = result.walk();
    for param in result.children(&mut cursor) {
        if param.kind() != "parameter_declaration" {
            continue;
        }
        let Some(type_node) = param.child_by_field_name("type") else {
            continue;
        };
        let t = type_from_node(type_node, source, depth + 1);
        let mut names = param.walk();
        let name_count = param.children_by_field_name("name", &mut names).count();
        for _ in 0..name_count.max(1) {
            out.push(t.clone());
        }
    }
    out
}

fn first_argument(call: Node) -> Option<Node> {
    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let first = args.named_children(&mut cursor).next();
    first
}

fn named_children_of(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Result tuples for a handful of well-known standard-library functions,
/// keyed by the local package name as written at the call site.
fn stdlib_result_types(package: &str, function: &str) -> Option<Vec<GoType>> {
    let results = match (package, function) {
        ("strconv", "Atoi") => vec![GoType::Int(IntKind::Int), GoType::Error],
        ("strconv", "ParseInt") => vec![GoType::Int(IntKind::Int64), GoType::Error],
        ("strconv", "ParseUint") => vec![GoType::Int(IntKind::Uint64), GoType::Error],
        ("strconv", "ParseFloat") => vec![GoType::Float, GoType::Error],
        ("strconv", "Quote") | ("strconv", "Itoa") => vec![GoType::String],
        ("os", "Open") | ("os", "Create") => vec![GoType::Unknown, GoType::Error],
        ("os", "ReadFile") => vec![
            GoType::Slice(Box::new(GoType::Int(IntKind::Uint8))),
            GoType::Error,
        ],
        ("io", "ReadAll") => vec![
            GoType::Slice(Box::new(GoType::Int(IntKind::Uint8))),
            GoType::Error,
        ],
        ("fmt", "Fprintf") | ("fmt", "Fprintln") | ("fmt", "Printf") | ("fmt", "Println") => {
            vec![GoType::Int(IntKind::Int), GoType::Error]
        }
        ("fmt", "Errorf") => vec![GoType::Error],
        ("fmt", "Sprintf") => vec![GoType::String],
        ("json", "Marshal") => vec![
            GoType::Slice(Box::new(GoType::Int(IntKind::Uint8))),
            GoType::Error,
        ],
        ("json", "Unmarshal") => vec![GoType::Error],
        ("time", "Now") => vec![GoType::Qualified("time".to_string(), "Time".to_string())],
        _ => return None,
    };
    Some(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_file;
    use std::path::PathBuf;

    fn package_of(source: &str) -> Package {
        let file = parse_file(PathBuf::from("test.go"), source.to_string()).unwrap();
        Package {
            name: "main".to_string(),
            module_root: PathBuf::from("."),
            files: vec![file],
        }
    }

    fn find_ident<'a>(node: Node<'a>, source: &str, name: &str, nth: usize) -> Option<Node<'a>> {
        fn walk<'a>(
            node: Node<'a>,
            source: &str,
            name: &str,
            seen: &mut usize,
            nth: usize,
        ) -> Option<Node<'a>> {
            if node.kind() == "identifier"
                && node.utf8_text(source.as_bytes()).unwrap_or("") == name
            {
                if *seen == nth {
                    return Some(node);
                }
                *seen += 1;
            }
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if let Some(found) = walk(child, source, name, seen, nth) {
                    return Some(found);
                }
            }
            None
        }
        walk(node, source, name, &mut 0, nth)
    }

    #[test]
    fn short_var_from_make_is_a_map() {
        let source = "package main\n\nfunc f() {\n\tm := make(map[string]int)\n\t_ = m\n}\n";
        let pkg = package_of(source);
        let file = &pkg.files[0];
        let resolver = TypeResolver::new(&pkg, file);

        let usage = find_ident(file.tree.root_node(), source, "m", 1).unwrap();
        let t = resolver.type_of(usage);
        assert!(matches!(t, GoType::Map(_, _)), "got {t}");
    }

    #[test]
    fn param_types_resolve() {
        let source = "package main\n\nfunc f(m map[string]int, n int64) {\n\t_ = m\n\t_ = n\n}\n";
        let pkg = package_of(source);
        let file = &pkg.files[0];
        let resolver = TypeResolver::new(&pkg, file);

        let m = find_ident(file.tree.root_node(), source, "m", 1).unwrap();
        assert!(matches!(resolver.type_of(m), GoType::Map(_, _)));
        let n = find_ident(file.tree.root_node(), source, "n", 1).unwrap();
        assert_eq!(resolver.type_of(n), GoType::Int(IntKind::Int64));
    }

    #[test]
    fn len_result_is_int() {
        let source = "package main\n\nfunc f(xs []string) {\n\tn := len(xs)\n\t_ = n\n}\n";
        let pkg = package_of(source);
        let file = &pkg.files[0];
        let resolver = TypeResolver::new(&pkg, file);

        let n = find_ident(file.tree.root_node(), source, "n", 1).unwrap();
        assert_eq!(resolver.type_of(n), GoType::Int(IntKind::Int));
    }

    #[test]
    fn named_type_resolves_to_underlying() {
        let source = "package main\n\ntype Registry map[string]int\n\nfunc f(r Registry) {\n\t_ = r\n}\n";
        let pkg = package_of(source);
        let file = &pkg.files[0];
        let resolver = TypeResolver::new(&pkg, file);

        let r = find_ident(file.tree.root_node(), source, "r", 1).unwrap();
        let t = resolver.type_of(r);
        assert_eq!(t, GoType::Named("Registry".to_string()));
        assert!(matches!(resolver.underlying(t), GoType::Map(_, _)));
    }

    #[test]
    fn multi_value_call_produces_tuple_types() {
        let source = "package main\n\nimport \"strconv\"\n\nfunc f(s string) {\n\tu, err := strconv.ParseUint(s, 10, 64)\n\t_ = u\n\t_ = err\n}\n";
        let pkg = package_of(source);
        let file = &pkg.files[0];
        let resolver = TypeResolver::new(&pkg, file);

        let u = find_ident(file.tree.root_node(), source, "u", 1).unwrap();
        assert_eq!(resolver.type_of(u), GoType::Int(IntKind::Uint64));
        let err = find_ident(file.tree.root_node(), source, "err", 1).unwrap();
        assert_eq!(resolver.type_of(err), GoType::Error);
    }

    #[test]
    fn local_function_results() {
        let source = "package main\n\nfunc fetch() (string, error) {\n\treturn \"\", nil\n}\n\nfunc f() {\n\tv, err := fetch()\n\t_ = v\n\t_ = err\n}\n";
        let pkg = package_of(source);
        let file = &pkg.files[0];
        let resolver = TypeResolver::new(&pkg, file);

        let v = find_ident(file.tree.root_node(), source, "v", 1).unwrap();
        assert_eq!(resolver.type_of(v), GoType::String);
        let err = find_ident(file.tree.root_node(), source, "err", 1).unwrap();
        assert_eq!(resolver.type_of(err), GoType::Error);
    }

    #[test]
    fn range_key_over_map_has_key_type() {
        let source = "package main\n\nfunc f(m map[string]int) {\n\tfor k := range m {\n\t\t_ = k\n\t}\n}\n";
        let pkg = package_of(source);
        let file = &pkg.files[0];
        let resolver = TypeResolver::new(&pkg, file);

        let k = find_ident(file.tree.root_node(), source, "k", 1).unwrap();
        assert_eq!(resolver.type_of(k), GoType::String);
    }

    #[test]
    fn same_object_distinguishes_shadowing() {
        let source = "package main\n\nfunc f(m map[string]int) {\n\tfor k := range m {\n\t\t_ = k\n\t}\n\tk := 1\n\t_ = k\n}\n";
        let pkg = package_of(source);
        let file = &pkg.files[0];
        let root = file.tree.root_node();
        let resolver = TypeResolver::new(&pkg, file);

        let range_k = find_ident(root, source, "k", 0).unwrap();
        let body_k = find_ident(root, source, "k", 1).unwrap();
        let outer_k = find_ident(root, source, "k", 3).unwrap();

        assert!(resolver.same_object(range_k, body_k));
        assert!(!resolver.same_object(body_k, outer_k));
    }

    #[test]
    fn blank_identifier_never_resolves() {
        let source = "package main\n\nfunc f() {\n\t_ = 1\n}\n";
        let pkg = package_of(source);
        let file = &pkg.files[0];
        let resolver = TypeResolver::new(&pkg, file);

        let blank = find_ident(file.tree.root_node(), source, "_", 0);
        if let Some(blank) = blank {
            assert!(resolver.resolve(blank).is_none());
        }
    }

    #[test]
    fn int_kind_names_round_trip() {
        for kind in [
            IntKind::Int,
            IntKind::Int8,
            IntKind::Int16,
            IntKind::Int32,
            IntKind::Int64,
            IntKind::Uint,
            IntKind::Uint8,
            IntKind::Uint16,
            IntKind::Uint32,
            IntKind::Uint64,
        ] {
            assert_eq!(IntKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(IntKind::from_name("byte"), Some(IntKind::Uint8));
        assert_eq!(IntKind::from_name("rune"), Some(IntKind::Int32));
        assert_eq!(IntKind::from_name("integer"), None);
    }

    #[test]
    fn widths_follow_the_host() {
        assert_eq!(IntKind::Int.width(true), 32);
        assert_eq!(IntKind::Int.width(false), 64);
        assert_eq!(IntKind::Uint16.width(true), 16);
        assert_eq!(IntKind::Uint64.width(true), 64);
    }
}
