//! Parse-tree nodes.
//!
//! A rule node records which rule produced it, the state that invoked the
//! rule, its child subtrees, and the first/last tokens it covers. Terminal
//! and error leaves wrap a single token. Parent links are weak; a tree is
//! owned root-down.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use allstar_core::Token;

use crate::errors::RecognitionError;

/// Interior node produced by a rule invocation.
#[derive(Debug, Default)]
pub struct RuleNode {
    pub rule_index: usize,
    /// ATN state that invoked this rule, -1 for the entry rule.
    pub invoking_state: isize,
    parent: Option<Weak<RefCell<RuleNode>>>,
    pub children: Vec<ParseTree>,
    pub start: Option<Rc<Token>>,
    pub stop: Option<Rc<Token>>,
    /// First syntax error thrown inside this rule, if any.
    pub exception: Option<RecognitionError>,
}

/// A subtree: rule node, matched token, or error leaf.
#[derive(Clone, Debug)]
pub enum ParseTree {
    Rule(Rc<RefCell<RuleNode>>),
    Terminal(Rc<Token>),
    Error(Rc<Token>),
}

impl RuleNode {
    pub fn new(rule_index: usize, invoking_state: isize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self {
            rule_index,
            invoking_state,
            ..Self::default()
        }))
    }

    pub fn parent(&self) -> Option<Rc<RefCell<RuleNode>>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_parent(&mut self, parent: Option<&Rc<RefCell<RuleNode>>>) {
        self.parent = parent.map(Rc::downgrade);
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, i: usize) -> Option<&ParseTree> {
        self.children.get(i)
    }

    pub fn add_terminal(&mut self, token: Rc<Token>) {
        self.children.push(ParseTree::Terminal(token));
    }

    pub fn add_error_node(&mut self, token: Rc<Token>) {
        self.children.push(ParseTree::Error(token));
    }

    pub fn remove_last_child(&mut self) {
        self.children.pop();
    }

    /// Invoking states from here to the root, innermost first. Feeds
    /// follow-set computation during error recovery.
    pub fn invocation_stack(node: &Rc<RefCell<RuleNode>>) -> Vec<usize> {
        let mut stack = Vec::new();
        let mut current = Some(Rc::clone(node));
        while let Some(n) = current {
            let n = n.borrow();
            if let Ok(state) = usize::try_from(n.invoking_state) {
                stack.push(state);
            }
            current = n.parent();
        }
        stack
    }
}

/// Link `child` under `parent` (both directions).
pub fn attach_rule_child(parent: &Rc<RefCell<RuleNode>>, child: &Rc<RefCell<RuleNode>>) {
    child.borrow_mut().set_parent(Some(parent));
    parent.borrow_mut().children.push(ParseTree::Rule(Rc::clone(child)));
}

/// Render LISP-style: `(rule child child ...)`.
pub fn to_string_tree(tree: &ParseTree, rule_names: &[&str]) -> String {
    match tree {
        ParseTree::Terminal(token) | ParseTree::Error(token) => node_text(token),
        ParseTree::Rule(node) => {
            let node = node.borrow();
            let name = rule_names
                .get(node.rule_index)
                .map_or_else(|| node.rule_index.to_string(), |n| (*n).to_owned());
            if node.children.is_empty() {
                return name;
            }
            let mut out = format!("({name}");
            for child in &node.children {
                out.push(' ');
                out.push_str(&to_string_tree(child, rule_names));
            }
            out.push(')');
            out
        }
    }
}

/// Matched tokens of the subtree in left-to-right order.
pub fn terminal_tokens(tree: &ParseTree) -> Vec<Rc<Token>> {
    let mut out = Vec::new();
    collect_terminals(tree, &mut out);
    out
}

fn collect_terminals(tree: &ParseTree, out: &mut Vec<Rc<Token>>) {
    match tree {
        ParseTree::Terminal(token) | ParseTree::Error(token) => out.push(Rc::clone(token)),
        ParseTree::Rule(node) => {
            for child in &node.borrow().children {
                collect_terminals(child, out);
            }
        }
    }
}

fn node_text(token: &Token) -> String {
    if token.token_type == allstar_core::TOKEN_EOF {
        return "<EOF>".to_owned();
    }
    token
        .text()
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}
