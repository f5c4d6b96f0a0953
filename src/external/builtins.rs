// src/external/builtins.rs

//! Runtime built-in module names.

/// Node core modules importable without the `node:` prefix.
pub const NODE_BUILTINS: &[&str] = &[
    "assert",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

/// Prefixes that always denote a runtime built-in.
pub const BUILTIN_PREFIXES: &[&str] = &["node:", "bun:"];

pub fn has_builtin_prefix(specifier: &str) -> bool {
    BUILTIN_PREFIXES.iter().any(|p| specifier.starts_with(p))
}

/// Bare node core module, including subpaths such as `fs/promises`.
pub fn is_node_builtin(specifier: &str) -> bool {
    let head = specifier.split('/').next().unwrap_or(specifier);
    NODE_BUILTINS.contains(&head)
}
