//! The ten language analysers.

pub mod c_lang;
pub mod cpp;
pub mod csharp;
pub mod go;
pub mod java;
pub mod python;
pub mod rust_lang;
pub mod typescript;
pub mod vbnet;

use std::sync::Arc;

use mycelium_core::types::Lang;

use crate::analyser::LanguageAnalyser;

/// Construct the analyser for a language. Called lazily by the registry.
pub fn build_analyser(lang: Lang) -> Arc<dyn LanguageAnalyser> {
    match lang {
        Lang::CSharp => Arc::new(csharp::CSharpAnalyser::new()),
        Lang::VbNet => Arc::new(vbnet::VbNetAnalyser::new()),
        Lang::TypeScript => Arc::new(typescript::TsAnalyser::new(Lang::TypeScript)),
        Lang::JavaScript => Arc::new(typescript::TsAnalyser::new(Lang::JavaScript)),
        Lang::Python => Arc::new(python::PythonAnalyser::new()),
        Lang::Java => Arc::new(java::JavaAnalyser::new()),
        Lang::Go => Arc::new(go::GoAnalyser::new()),
        Lang::Rust => Arc::new(rust_lang::RustAnalyser::new()),
        Lang::C => Arc::new(c_lang::CAnalyser::new()),
        Lang::Cpp => Arc::new(cpp::CppAnalyser::new()),
    }
}

/// Strip generic/template arguments from a type name (`List<Foo>` → `List`).
pub(crate) fn strip_generics(name: &str) -> &str {
    name.split(['<', '(']).next().unwrap_or(name).trim()
}
