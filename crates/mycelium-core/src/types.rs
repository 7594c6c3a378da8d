use serde::{Deserialize, Serialize};

/// Languages the analysers understand. The wire form is the lowercase
/// file extension without a leading dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lang {
    #[serde(rename = "cs")]
    CSharp,
    #[serde(rename = "vb")]
    VbNet,
    #[serde(rename = "ts")]
    TypeScript,
    #[serde(rename = "js")]
    JavaScript,
    #[serde(rename = "py")]
    Python,
    #[serde(rename = "java")]
    Java,
    #[serde(rename = "go")]
    Go,
    #[serde(rename = "rs")]
    Rust,
    #[serde(rename = "c")]
    C,
    #[serde(rename = "cpp")]
    Cpp,
}

impl Lang {
    /// Returns the canonical language tag (lowercase extension).
    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::CSharp => "cs",
            Lang::VbNet => "vb",
            Lang::TypeScript => "ts",
            Lang::JavaScript => "js",
            Lang::Python => "py",
            Lang::Java => "java",
            Lang::Go => "go",
            Lang::Rust => "rs",
            Lang::C => "c",
            Lang::Cpp => "cpp",
        }
    }

    /// Detect the language from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "cs" => Some(Lang::CSharp),
            "vb" => Some(Lang::VbNet),
            "ts" | "tsx" => Some(Lang::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Lang::JavaScript),
            "py" | "pyi" => Some(Lang::Python),
            "java" => Some(Lang::Java),
            "go" => Some(Lang::Go),
            "rs" => Some(Lang::Rust),
            "c" | "h" => Some(Lang::C),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(Lang::Cpp),
            _ => None,
        }
    }

    /// Parse a user-supplied tag (as passed to `--languages`).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "cs" => Some(Lang::CSharp),
            "vb" => Some(Lang::VbNet),
            "ts" => Some(Lang::TypeScript),
            "js" => Some(Lang::JavaScript),
            "py" => Some(Lang::Python),
            "java" => Some(Lang::Java),
            "go" => Some(Lang::Go),
            "rs" => Some(Lang::Rust),
            "c" => Some(Lang::C),
            "cpp" => Some(Lang::Cpp),
            _ => None,
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of declaration a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Class,
    Function,
    Method,
    Interface,
    Struct,
    Enum,
    Namespace,
    Property,
    Constructor,
    Module,
    Record,
    Delegate,
    TypeAlias,
    Constant,
    Variable,
    Trait,
    Impl,
    Macro,
    Template,
    Typedef,
    Annotation,
    Static,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Interface => "interface",
            SymbolKind::Struct => "struct",
            SymbolKind::Enum => "enum",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Property => "property",
            SymbolKind::Constructor => "constructor",
            SymbolKind::Module => "module",
            SymbolKind::Record => "record",
            SymbolKind::Delegate => "delegate",
            SymbolKind::TypeAlias => "type_alias",
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::Trait => "trait",
            SymbolKind::Impl => "impl",
            SymbolKind::Macro => "macro",
            SymbolKind::Template => "template",
            SymbolKind::Typedef => "typedef",
            SymbolKind::Annotation => "annotation",
            SymbolKind::Static => "static",
        }
    }

    /// Whether a symbol of this kind can contain executable call sites.
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            SymbolKind::Function
                | SymbolKind::Method
                | SymbolKind::Constructor
                | SymbolKind::Property
        )
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared visibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Internal,
    Protected,
    #[default]
    Unknown,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::Internal => "internal",
            Visibility::Protected => "protected",
            Visibility::Unknown => "unknown",
        }
    }
}

/// A source file recorded during the structure walk. Immutable after Phase 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileNode {
    /// Repo-relative, forward-slash path.
    pub path: String,
    pub lang: Option<Lang>,
    pub size: u64,
    pub lines: u32,
    /// False for oversized files and files of unavailable languages.
    pub parseable: bool,
}

/// A directory recorded during the structure walk. Paths carry a trailing slash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNode {
    pub path: String,
    pub file_count: u32,
}

/// A named declaration extracted from source. Immutable after Phase 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Stable id of the form `sym_<zero-padded-sequence>`.
    pub id: String,
    pub name: String,
    pub kind: SymbolKind,
    /// Declaring file (repo-relative, forward-slash).
    pub file: String,
    /// 1-based declaration line.
    pub line: u32,
    /// 1-based last line of the declaration body.
    pub end_line: u32,
    pub visibility: Visibility,
    /// True when the symbol is visible across module boundaries under the
    /// language's export rules.
    pub exported: bool,
    /// Containing symbol id (methods and properties point at their type).
    pub parent: Option<String>,
    pub lang: Lang,
    /// Namespace or package the symbol is declared in, when the language has one.
    pub namespace: Option<String>,
    /// Attribute / annotation / decorator names attached to the declaration.
    pub attributes: Vec<String>,
    /// Base type names (extends + implements), unresolved.
    pub bases: Vec<String>,
    /// Constructor-injected parameter or field name → type name.
    pub injected_types: Vec<(String, String)>,
}

/// Confidence bucket for a resolved call edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallTier {
    A,
    B,
    C,
}

impl CallTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallTier::A => "A",
            CallTier::B => "B",
            CallTier::C => "C",
        }
    }
}

/// A resolved call edge. Multiple edges between the same pair are allowed
/// when distinct call sites exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEdge {
    pub from: String,
    pub to: String,
    pub confidence: f64,
    pub tier: CallTier,
    pub reason: String,
    pub line: u32,
}

/// A resolved file → file import edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportEdge {
    pub from_file: String,
    pub to_file: String,
    pub raw: String,
}

/// An import whose target could not be mapped to a repository file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedImport {
    pub file: String,
    pub specifier: String,
    pub raw: String,
}

/// A project → project reference extracted from `.sln`/`.csproj` files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectReference {
    pub from_project: String,
    pub to_project: String,
    pub kind: String,
}

/// A NuGet package reference extracted from a project file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageReference {
    pub project: String,
    pub package: String,
    pub version: String,
}

/// A cluster of densely interacting symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    /// `community_<n>`, assigned largest-first.
    pub id: String,
    pub label: String,
    pub members: Vec<String>,
    /// Internal edge weight over maximum possible internal edges, in [0, 1].
    pub cohesion: f64,
    pub lang: Lang,
}

/// Whether a traced flow stays within one community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    IntraCommunity,
    CrossCommunity,
}

/// A traced execution flow from a scored entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// `process_<n>`, assigned highest-confidence-first.
    pub id: String,
    pub entry: String,
    pub terminal: String,
    pub steps: Vec<String>,
    pub kind: ProcessKind,
    /// Product of edge confidences along the path, in [0, 1].
    pub confidence: f64,
}

/// Wall-clock duration of a completed pipeline phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTiming {
    pub phase: String,
    pub millis: u64,
}

/// Errors surfaced by the analysis pipeline.
///
/// Anything attributable to user input degrades locally instead; only
/// invariant violations and cancellation abort a run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("root path is not a directory: {0}")]
    InvalidRoot(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("analysis cancelled")]
    Cancelled,

    #[error("internal invariant violated in {phase}: {detail}")]
    Invariant { phase: &'static str, detail: String },
}

/// Format a symbol id from its global sequence number.
pub fn symbol_id(seq: usize) -> String {
    format!("sym_{seq:04}")
}
