//! Block structure of a tokenized Python module
//!
//! Validates indentation, then records every function and class with its
//! cyclomatic complexity, and every plain name that is assigned to.

use super::lexer::{LogicalLine, SyntaxProblem, Token, TokenKind};
use std::collections::BTreeSet;

/// A `def` or `async def`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub line: usize,
    pub is_async: bool,
    /// 1 + branches + handlers + boolean operators, nested functions included
    pub complexity: u32,
}

/// A `class` with the functions defined directly in its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub name: String,
    pub line: usize,
    /// Indices into [`ModuleStructure::functions`]
    pub methods: Vec<usize>,
}

/// A plain name bound by assignment, loop target, `with ... as` or `:=`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameBinding {
    pub name: String,
    pub line: usize,
}

/// Functions, classes and bindings of one module, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleStructure {
    pub functions: Vec<FunctionInfo>,
    pub classes: Vec<ClassInfo>,
    pub bindings: Vec<NameBinding>,
}

impl ModuleStructure {
    /// Sum of the complexities of a class's direct methods
    pub fn class_complexity(&self, class: &ClassInfo) -> u32 {
        class
            .methods
            .iter()
            .filter_map(|&i| self.functions.get(i))
            .map(|f| f.complexity)
            .sum()
    }

    /// Sum of all function complexities
    pub fn total_complexity(&self) -> u32 {
        self.functions.iter().map(|f| f.complexity).sum()
    }
}

#[derive(Debug, Clone, Copy)]
enum ScopeKind {
    Function(usize),
    Class(usize),
    Block,
}

#[derive(Debug, Clone, Copy)]
struct Scope {
    header_indent: usize,
    kind: ScopeKind,
}

/// Build the module structure, failing on the first indentation problem
pub fn analyze(lines: &[LogicalLine]) -> Result<ModuleStructure, SyntaxProblem> {
    let mut module = ModuleStructure::default();
    let mut indents = vec![0usize];
    let mut scopes: Vec<Scope> = Vec::new();
    let mut pending_header: Option<&LogicalLine> = None;

    for line in lines {
        let top = indents.last().copied().unwrap_or(0);

        if let Some(header) = pending_header.take() {
            if line.indent <= top {
                return Err(expected_block(header, line.line));
            }
            indents.push(line.indent);
        } else if line.indent > top {
            return Err(SyntaxProblem::new(line.line, "unexpected indent"));
        } else if line.indent < top {
            while indents.last().map_or(false, |&i| i > line.indent) {
                indents.pop();
            }
            if indents.last() != Some(&line.indent) {
                return Err(SyntaxProblem::new(
                    line.line,
                    "unindent does not match any outer indentation level",
                ));
            }
        }

        while scopes
            .last()
            .map_or(false, |s| line.indent <= s.header_indent)
        {
            scopes.pop();
        }

        let kind = module.visit(line, &scopes)?;
        module.collect_bindings(line);

        if line.is_block_header() {
            pending_header = Some(line);
            scopes.push(Scope {
                header_indent: line.indent,
                kind,
            });
        }
    }

    if let Some(header) = pending_header {
        return Err(expected_block(header, header.line));
    }

    Ok(module)
}

fn expected_block(header: &LogicalLine, at: usize) -> SyntaxProblem {
    SyntaxProblem::new(
        at,
        format!("expected an indented block after line {}", header.line),
    )
}

impl ModuleStructure {
    /// Record definitions and complexity for one statement line
    fn visit(&mut self, line: &LogicalLine, scopes: &[Scope]) -> Result<ScopeKind, SyntaxProblem> {
        let tokens = &line.tokens;
        let is_async = tokens.first().map_or(false, |t| t.is_keyword("async"));
        let keyword = tokens.get(usize::from(is_async));

        let mut increment = tokens
            .iter()
            .filter(|t| t.is_keyword("and") || t.is_keyword("or"))
            .count() as u32;

        let keyword_text = keyword
            .filter(|t| t.kind == TokenKind::Name)
            .map(|t| t.text.as_str());

        match keyword_text {
            Some("def") | Some("class") => {
                let name_idx = usize::from(is_async) + 1;
                let name = tokens
                    .get(name_idx)
                    .filter(|t| t.is_identifier())
                    .ok_or_else(|| SyntaxProblem::new(line.line, "invalid syntax"))?;

                // The definition's own line (defaults, inline body) counts
                // toward every enclosing function
                self.add_to_enclosing(scopes, increment);

                if keyword_text == Some("def") {
                    let index = self.functions.len();
                    self.functions.push(FunctionInfo {
                        name: name.text.clone(),
                        line: line.line,
                        is_async,
                        complexity: 1 + increment,
                    });
                    if let Some(Scope {
                        kind: ScopeKind::Class(ci),
                        ..
                    }) = scopes.last()
                    {
                        self.classes[*ci].methods.push(index);
                    }
                    Ok(ScopeKind::Function(index))
                } else {
                    self.classes.push(ClassInfo {
                        name: name.text.clone(),
                        line: line.line,
                        methods: Vec::new(),
                    });
                    Ok(ScopeKind::Class(self.classes.len() - 1))
                }
            }
            other => {
                if matches!(other, Some("if" | "elif" | "while" | "for" | "except")) {
                    increment += 1;
                }
                self.add_to_enclosing(scopes, increment);
                Ok(ScopeKind::Block)
            }
        }
    }

    fn add_to_enclosing(&mut self, scopes: &[Scope], amount: u32) {
        if amount == 0 {
            return;
        }
        for scope in scopes {
            if let ScopeKind::Function(fi) = scope.kind {
                self.functions[fi].complexity += amount;
            }
        }
    }

    fn collect_bindings(&mut self, line: &LogicalLine) {
        let tokens = &line.tokens;
        let mut targets = BTreeSet::new();

        for_targets(tokens, &mut targets);
        walrus_targets(tokens, &mut targets);

        let body_start = match compound_header_end(tokens) {
            Some(colon) => {
                if tokens.first().map_or(false, |t| t.is_keyword("with"))
                    || (tokens.first().map_or(false, |t| t.is_keyword("async"))
                        && tokens.get(1).map_or(false, |t| t.is_keyword("with")))
                {
                    with_targets(&tokens[..colon], &mut targets);
                }
                colon + 1
            }
            None => 0,
        };

        for (start, end) in split_statements(tokens, body_start) {
            assignment_targets(tokens, start, end, &mut targets);
        }

        self.bindings.extend(targets.into_iter().map(|i| NameBinding {
            name: tokens[i].text.clone(),
            line: tokens[i].line,
        }));
    }
}

const COMPOUND_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "try", "except", "finally", "with", "def", "class",
    "async",
];

const AUGMENTED_OPS: &[&str] = &[
    "+=", "-=", "*=", "/=", "//=", "%=", "**=", ">>=", "<<=", "&=", "|=", "^=", "@=",
];

/// Index of the `:` closing a compound statement header, if the line is one
fn compound_header_end(tokens: &[Token]) -> Option<usize> {
    let first = tokens.first()?;
    if first.kind != TokenKind::Name || !COMPOUND_KEYWORDS.contains(&first.text.as_str()) {
        return None;
    }

    let mut depth = 0usize;
    let mut lambdas = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_open_bracket() {
            depth += 1;
        } else if token.is_close_bracket() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_keyword("lambda") {
            lambdas += 1;
        } else if depth == 0 && token.is_op(":") {
            if lambdas > 0 {
                lambdas -= 1;
            } else {
                return Some(i);
            }
        }
    }
    None
}

/// Ranges of `;`-separated simple statements starting at `from`
fn split_statements(tokens: &[Token], from: usize) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut depth = 0usize;
    let mut start = from;

    for (i, token) in tokens.iter().enumerate().skip(from) {
        if token.is_open_bracket() {
            depth += 1;
        } else if token.is_close_bracket() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_op(";") {
            ranges.push((start, i));
            start = i + 1;
        }
    }
    if start < tokens.len() {
        ranges.push((start, tokens.len()));
    }
    ranges
}

/// Targets of `=`, augmented and annotated assignments in one statement
fn assignment_targets(tokens: &[Token], start: usize, end: usize, out: &mut BTreeSet<usize>) {
    let stmt = &tokens[start..end];

    // Annotated: `name: type [= value]`
    if stmt.len() >= 2 && stmt[0].is_identifier() && stmt[1].is_op(":") {
        out.insert(start);
        return;
    }

    let mut depth = 0usize;
    let mut segment_start = 0usize;
    for (i, token) in stmt.iter().enumerate() {
        if token.is_open_bracket() {
            depth += 1;
        } else if token.is_close_bracket() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_keyword("lambda") {
            break;
        } else if depth == 0 && token.kind == TokenKind::Op {
            if token.text == "=" {
                target_names(stmt, segment_start, i, start, out);
                segment_start = i + 1;
            } else if AUGMENTED_OPS.contains(&token.text.as_str()) {
                target_names(stmt, segment_start, i, start, out);
                break;
            }
        }
    }
}

/// Plain names in a target expression, skipping attribute, subscript and
/// call bases
fn target_names(stmt: &[Token], from: usize, to: usize, offset: usize, out: &mut BTreeSet<usize>) {
    let mut i = from;
    while i < to {
        let token = &stmt[i];
        if token.is_identifier() {
            let after_dot = i > from && stmt[i - 1].is_op(".");
            let continues = stmt
                .get(i + 1)
                .filter(|_| i + 1 < to)
                .map_or(false, |n| n.is_op(".") || n.is_op("(") || n.is_op("["));
            if !after_dot && !continues {
                out.insert(offset + i);
            }
            i += 1;
        } else if token.is_open_bracket() {
            let grouping = i == from
                || matches!(stmt[i - 1].text.as_str(), "," | "(" | "[" | "*" | "=")
                    && stmt[i - 1].kind == TokenKind::Op;
            if grouping {
                i += 1;
            } else {
                i = skip_group(stmt, i, to);
            }
        } else {
            i += 1;
        }
    }
}

/// Index just past the bracket group opening at `open`
fn skip_group(tokens: &[Token], open: usize, limit: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().take(limit).skip(open) {
        if token.is_open_bracket() {
            depth += 1;
        } else if token.is_close_bracket() {
            depth -= 1;
            if depth == 0 {
                return i + 1;
            }
        }
    }
    limit
}

/// Loop targets of `for` statements and comprehensions
fn for_targets(tokens: &[Token], out: &mut BTreeSet<usize>) {
    for (i, token) in tokens.iter().enumerate() {
        if !token.is_keyword("for") {
            continue;
        }
        let mut depth = 0usize;
        let mut end = i + 1;
        while let Some(t) = tokens.get(end) {
            if t.is_open_bracket() {
                depth += 1;
            } else if t.is_close_bracket() {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            } else if depth == 0 && t.is_keyword("in") {
                break;
            }
            end += 1;
        }
        target_names(tokens, i + 1, end, 0, out);
    }
}

/// `name :=` anywhere in the line
fn walrus_targets(tokens: &[Token], out: &mut BTreeSet<usize>) {
    for (i, pair) in tokens.windows(2).enumerate() {
        if pair[0].is_identifier() && pair[1].is_op(":=") {
            out.insert(i);
        }
    }
}

/// `with ctx as name` targets within a header
fn with_targets(header: &[Token], out: &mut BTreeSet<usize>) {
    for (i, token) in header.iter().enumerate() {
        if !token.is_keyword("as") {
            continue;
        }
        let name = header.get(i + 1);
        let after = header.get(i + 2);
        let plain = after.map_or(true, |t| t.is_op(",") || t.is_op(")"));
        if name.map_or(false, |n| n.is_identifier()) && plain {
            out.insert(i + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn parse(src: &str) -> ModuleStructure {
        analyze(&tokenize(src).unwrap()).unwrap()
    }

    fn problem(src: &str) -> SyntaxProblem {
        analyze(&tokenize(src).unwrap()).unwrap_err()
    }

    fn bound(module: &ModuleStructure) -> Vec<&str> {
        module.bindings.iter().map(|b| b.name.as_str()).collect()
    }

    #[test]
    fn test_function_complexity() {
        let src = "\
def check(a, b, c):
    if a and b or c:
        return 1
    elif b:
        for x in range(3):
            while x:
                x -= 1
    try:
        pass
    except ValueError:
        pass
    except KeyError:
        pass
    else:
        pass
    return [y for y in range(3) if y]
";
        let module = parse(src);
        assert_eq!(module.functions.len(), 1);
        // 1 + if + and + or + elif + for + while + 2 except
        assert_eq!(module.functions[0].complexity, 9);
    }

    #[test]
    fn test_nested_functions_count_toward_parent() {
        let src = "\
def outer():
    def inner(flag):
        if flag:
            return 1
        return 0
    return inner
";
        let module = parse(src);
        let outer = &module.functions[0];
        let inner = &module.functions[1];
        assert_eq!(inner.complexity, 2);
        assert_eq!(outer.complexity, 2);
        assert_eq!(module.total_complexity(), 4);
    }

    #[test]
    fn test_class_complexity_sums_direct_methods() {
        let src = "\
class Handler:
    def get(self, x):
        if x:
            return x
    async def post(self, y):
        async for item in y:
            pass
    if True:
        def hidden(self):
            pass

def free():
    pass
";
        let module = parse(src);
        assert_eq!(module.classes.len(), 1);
        assert_eq!(module.functions.len(), 4);
        assert!(module.functions[1].is_async);

        let class = &module.classes[0];
        assert_eq!(class.methods, vec![0, 1]);
        assert_eq!(module.class_complexity(class), 4);
    }

    #[test]
    fn test_one_line_definitions() {
        let module = parse("def tiny(): return a or b\nclass Empty: pass\n");
        assert_eq!(module.functions[0].complexity, 2);
        assert_eq!(module.classes[0].name, "Empty");
    }

    #[test]
    fn test_bindings() {
        let src = "\
myVar = other.attr = items[0] = 1
a, (B, *rest) = values
total += 1
count: int = 0
for Item in things:
    pass
with open(p) as Handle, lock:
    pass
if (found := lookup()):
    pass
squares = [n * n for N in range(3)]
call(keyword=1)
adder = lambda x=1: x
";
        let module = parse(src);
        assert_eq!(
            bound(&module),
            vec!["myVar", "a", "B", "rest", "total", "count", "Item", "Handle", "found", "squares", "N", "adder"]
        );
        assert_eq!(module.bindings[6].line, 5);
    }

    #[test]
    fn test_inline_body_bindings() {
        let module = parse("if ready: result = 1; other = 2\nelse: fallback = 0\n");
        assert_eq!(bound(&module), vec!["result", "other", "fallback"]);
    }

    #[test]
    fn test_indentation_problems() {
        let err = problem("x = 1\n    y = 2\n");
        assert_eq!(err, SyntaxProblem::new(2, "unexpected indent"));

        let err = problem("if x:\n        y = 1\n    z = 2\n");
        assert_eq!(err.line, 3);
        assert!(err.message.starts_with("unindent does not match"));

        let err = problem("def f():\nreturn 1\n");
        assert_eq!(err.line, 2);
        assert!(err.message.starts_with("expected an indented block"));

        let err = problem("x = 1\nwhile x:\n");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_def_without_name() {
        let err = problem("def (x):\n    pass\n");
        assert_eq!(err.message, "invalid syntax");
    }

    #[test]
    fn test_empty_module() {
        assert_eq!(parse(""), ModuleStructure::default());
    }
}
