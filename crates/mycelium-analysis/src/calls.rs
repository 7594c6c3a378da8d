//! Phase 4: three-tier call resolution.
//!
//! Tier A follows Phase 3 import edges (plus C# constructor-injection and
//! interface→implementation fan-out), Tier B stays within the caller's
//! file, and Tier C falls back to the global fuzzy index, preserving
//! ambiguity as multiple low-confidence edges. Tiers never cascade once one
//! has matched.

use std::collections::{HashMap, HashSet};

use mycelium_core::cancel::CancellationToken;
use mycelium_core::graph::KnowledgeGraph;
use mycelium_core::symbols::SymbolTable;
use mycelium_core::types::{AnalysisError, CallEdge, CallTier, SymbolKind};
use mycelium_parsers::analyser::{AnalyserRegistry, RawCall};

use crate::parsing::FileAnalyses;

const CONF_IMPORT: f64 = 0.9;
const CONF_DI: f64 = 0.85;
const CONF_IMPL: f64 = 0.85;
const CONF_SAME_FILE: f64 = 0.85;
const CONF_FUZZY_UNIQUE: f64 = 0.5;
const CONF_FUZZY_AMBIGUOUS: f64 = 0.3;

/// Receiver spellings that always mean "the current object".
const SELF_QUALIFIERS: &[&str] = &["this", "self", "Me", "MyBase", "super"];

pub fn run(
    graph: &mut KnowledgeGraph,
    table: &SymbolTable,
    analyses: &FileAnalyses,
    registry: &AnalyserRegistry,
    token: &CancellationToken,
) -> Result<(), AnalysisError> {
    resolve_inheritance(graph, table);
    let implementations = implementation_map(graph);

    // Immutable view of the symbols needed while emitting edges.
    let symbols: HashMap<String, SymbolView> = graph
        .symbols()
        .map(|s| {
            (
                s.id.clone(),
                SymbolView {
                    kind: s.kind,
                    file: s.file.clone(),
                    line: s.line,
                    end_line: s.end_line,
                    injected: s.injected_types.clone(),
                    parent: s.parent.clone(),
                },
            )
        })
        .collect();

    for (path, analysis) in analyses {
        if token.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        let Some(lang) = graph.file(path).and_then(|f| f.lang) else {
            continue;
        };
        let exclusions: HashSet<&str> = registry
            .analyser_for(lang)
            .builtin_exclusions()
            .iter()
            .copied()
            .collect();
        let imported = graph.imports_of(path);
        let callables = callable_spans(table, &symbols, path);

        let mut edges: Vec<CallEdge> = Vec::new();
        for call in &analysis.calls {
            if is_builtin(call, &exclusions) {
                continue;
            }
            let Some(caller) = enclosing_symbol(&callables, call.line) else {
                continue; // top-level call with no enclosing declaration
            };
            resolve_call(
                call,
                caller,
                path,
                table,
                &symbols,
                &imported,
                &implementations,
                &mut edges,
            );
        }
        for edge in edges {
            graph.add_call(&edge);
        }
    }
    Ok(())
}

struct SymbolView {
    kind: SymbolKind,
    file: String,
    line: u32,
    end_line: u32,
    injected: Vec<(String, String)>,
    parent: Option<String>,
}

/// Resolve recorded base-type names to Inherits edges. Same-file targets
/// win; otherwise the first fuzzy candidate keeps things deterministic.
fn resolve_inheritance(graph: &mut KnowledgeGraph, table: &SymbolTable) {
    let mut edges: Vec<(String, String)> = Vec::new();
    for symbol in graph.symbols() {
        for base in &symbol.bases {
            let base = base.rsplit("::").next().unwrap_or(base);
            let base = base.rsplit('.').next().unwrap_or(base);
            let target = table
                .lookup(&symbol.file, base)
                .map(String::from)
                .or_else(|| table.lookup_fuzzy(base).first().cloned());
            if let Some(target) = target {
                if target != symbol.id {
                    edges.push((symbol.id.clone(), target));
                }
            }
        }
    }
    for (from, to) in edges {
        graph.add_inherits(&from, &to);
    }
}

/// Interface/trait id → implementing type views (id, file).
fn implementation_map(graph: &KnowledgeGraph) -> HashMap<String, Vec<(String, String)>> {
    let mut map: HashMap<String, Vec<(String, String)>> = HashMap::new();
    for (from, to) in graph.inherit_edges() {
        let Some(target) = graph.symbol(&to) else {
            continue;
        };
        if !matches!(target.kind, SymbolKind::Interface | SymbolKind::Trait) {
            continue;
        }
        let Some(source) = graph.symbol(&from) else {
            continue;
        };
        if matches!(
            source.kind,
            SymbolKind::Class | SymbolKind::Struct | SymbolKind::Record | SymbolKind::Impl
        ) {
            map.entry(to.clone())
                .or_default()
                .push((from.clone(), source.file.clone()));
        }
    }
    map
}

fn is_builtin(call: &RawCall, exclusions: &HashSet<&str>) -> bool {
    if exclusions.contains(call.callee.as_str()) {
        return true;
    }
    if let Some(qualifier) = &call.qualifier {
        let head = qualifier.split('.').next().unwrap_or(qualifier);
        if exclusions.contains(qualifier.as_str())
            || exclusions.contains(head)
            || exclusions.contains(format!("{qualifier}.{}", call.callee).as_str())
        {
            return true;
        }
    }
    false
}

/// Callable symbols of a file as (id, line, end_line), declaration order.
fn callable_spans<'a>(
    table: &'a SymbolTable,
    symbols: &'a HashMap<String, SymbolView>,
    path: &str,
) -> Vec<(&'a str, u32, u32)> {
    table
        .symbols_in_file(path)
        .iter()
        .filter_map(|id| {
            let view = symbols.get(id)?;
            view.kind
                .is_callable()
                .then_some((id.as_str(), view.line, view.end_line))
        })
        .collect()
}

/// Innermost callable whose span contains the line.
fn enclosing_symbol<'a>(callables: &[(&'a str, u32, u32)], line: u32) -> Option<&'a str> {
    callables
        .iter()
        .filter(|(_, start, end)| *start <= line && line <= *end)
        .min_by_key(|(_, start, end)| end - start)
        .map(|(id, _, _)| *id)
}

#[allow(clippy::too_many_arguments)]
fn resolve_call(
    call: &RawCall,
    caller: &str,
    path: &str,
    table: &SymbolTable,
    symbols: &HashMap<String, SymbolView>,
    imported: &[String],
    implementations: &HashMap<String, Vec<(String, String)>>,
    edges: &mut Vec<CallEdge>,
) {
    let self_call = call
        .qualifier
        .as_deref()
        .map(|q| SELF_QUALIFIERS.contains(&q))
        .unwrap_or(false);

    // ── Tier A: import-resolved ─────────────────────────────────────
    if !self_call {
        let mut matched = false;
        if let Some(target) = resolve_via_imports(call, table, imported) {
            emit(edges, caller, &target, CONF_IMPORT, CallTier::A, "import-resolved", call.line);
            fan_out_implementations(
                call, caller, &target, table, symbols, implementations, edges,
            );
            matched = true;
        } else if let Some(target) = resolve_via_injection(call, caller, path, table, symbols) {
            emit(edges, caller, &target, CONF_DI, CallTier::A, "di-resolved", call.line);
            fan_out_implementations(
                call, caller, &target, table, symbols, implementations, edges,
            );
            matched = true;
        }
        if matched {
            return;
        }
    }

    // ── Tier B: same file ───────────────────────────────────────────
    if let Some(target) = table.lookup(path, &call.callee) {
        if target != caller {
            emit(edges, caller, target, CONF_SAME_FILE, CallTier::B, "same-file", call.line);
        }
        return;
    }
    if self_call {
        return;
    }

    // ── Tier C: fuzzy ───────────────────────────────────────────────
    let candidates: Vec<&String> = table
        .lookup_fuzzy(&call.callee)
        .iter()
        .filter(|id| id.as_str() != caller)
        .collect();
    match candidates.len() {
        0 => {}
        1 => emit(
            edges, caller, candidates[0], CONF_FUZZY_UNIQUE, CallTier::C, "fuzzy", call.line,
        ),
        _ => {
            for candidate in candidates {
                emit(
                    edges, caller, candidate, CONF_FUZZY_AMBIGUOUS, CallTier::C, "fuzzy",
                    call.line,
                );
            }
        }
    }
}

/// Does the qualifier belong to this imported file: one of its segments is
/// a declared symbol, the file stem, or the containing directory (Go
/// package style). A leading `this`/`self`/`Me` segment is receiver noise.
fn qualifier_matches_file(qualifier: &str, file: &str, table: &SymbolTable) -> bool {
    let stem = file
        .rsplit('/')
        .next()
        .and_then(|n| n.split('.').next())
        .unwrap_or("");
    let dir = file
        .rsplit_once('/')
        .map(|(d, _)| d.rsplit('/').next().unwrap_or(d))
        .unwrap_or("");
    qualifier
        .split(['.', ':'])
        .filter(|s| !s.is_empty() && !SELF_QUALIFIERS.contains(s))
        .any(|segment| {
            segment == stem || segment == dir || table.lookup(file, segment).is_some()
        })
}

fn resolve_via_imports(
    call: &RawCall,
    table: &SymbolTable,
    imported: &[String],
) -> Option<String> {
    for file in imported {
        let Some(target) = table.lookup(file, &call.callee) else {
            continue;
        };
        let matches = match &call.qualifier {
            None => true,
            Some(q) => qualifier_matches_file(q, file, table),
        };
        if matches {
            return Some(target.to_string());
        }
    }
    None
}

/// C# dependency injection: a qualifier naming a constructor-injected
/// field/parameter resolves through the injected type.
fn resolve_via_injection(
    call: &RawCall,
    caller: &str,
    path: &str,
    table: &SymbolTable,
    symbols: &HashMap<String, SymbolView>,
) -> Option<String> {
    let qualifier = call.qualifier.as_deref()?;
    let declaring_type = symbols
        .get(caller)
        .and_then(|view| view.parent.as_ref())
        .and_then(|parent| symbols.get(parent))?;
    let (_, type_name) = declaring_type
        .injected
        .iter()
        .find(|(name, _)| name == qualifier)?;

    // The injected type itself: same file first, then the global index.
    let type_id = table
        .lookup(path, type_name)
        .map(String::from)
        .or_else(|| {
            table
                .lookup_fuzzy(type_name)
                .iter()
                .find(|id| {
                    symbols.get(id.as_str()).is_some_and(|v| {
                        matches!(
                            v.kind,
                            SymbolKind::Class
                                | SymbolKind::Interface
                                | SymbolKind::Struct
                                | SymbolKind::Record
                        )
                    })
                })
                .cloned()
        })?;
    let type_file = &symbols.get(&type_id)?.file;
    table.lookup(type_file, &call.callee).map(String::from)
}

/// When a Tier-A target is an interface (or its method), emit edges to the
/// same-named member of every implementing type.
fn fan_out_implementations(
    call: &RawCall,
    caller: &str,
    target: &str,
    table: &SymbolTable,
    symbols: &HashMap<String, SymbolView>,
    implementations: &HashMap<String, Vec<(String, String)>>,
    edges: &mut Vec<CallEdge>,
) {
    let Some(view) = symbols.get(target) else {
        return;
    };
    // Either the interface itself or a member declared on it.
    let interface_id = match view.kind {
        SymbolKind::Interface => target.to_string(),
        _ => match &view.parent {
            Some(parent)
                if symbols
                    .get(parent)
                    .is_some_and(|p| p.kind == SymbolKind::Interface) =>
            {
                parent.clone()
            }
            _ => return,
        },
    };
    let Some(impls) = implementations.get(&interface_id) else {
        return;
    };
    for (_, impl_file) in impls {
        if let Some(member) = table.lookup(impl_file, &call.callee) {
            if member != target {
                emit(edges, caller, member, CONF_IMPL, CallTier::A, "impl-resolved", call.line);
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn emit(
    edges: &mut Vec<CallEdge>,
    from: &str,
    to: &str,
    confidence: f64,
    tier: CallTier,
    reason: &str,
    line: u32,
) {
    edges.push(CallEdge {
        from: from.to_string(),
        to: to.to_string(),
        confidence,
        tier,
        reason: reason.to_string(),
        line,
    });
}

#[cfg(test)]
#[path = "calls_tests.rs"]
mod tests;
