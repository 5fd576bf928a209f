//! Delimiter matching over inline sibling lists.
//!
//! Each sibling list is processed independently: adjacent text nodes are
//! merged, text is split into plain segments and delimiter tokens, and tokens
//! are paired with an opener stack. A matched span is replaced by the node the
//! processor builds; unmatched tokens fall back to literal text.

use std::mem;
use std::sync::Arc;

use super::{DelimiterProcessor, DelimiterRun};
use crate::node::{Node, NodeKind};

/// A delimiter token found in text.
#[derive(Debug)]
struct Token {
    text: String,
    run: DelimiterRun,
    /// Processor whose opening token this is.
    opens: Option<usize>,
    /// Whether some processor uses this token to close.
    closes: bool,
}

#[derive(Debug)]
enum Item {
    Node(Node),
    Token(Token),
}

impl Item {
    fn into_node(self) -> Node {
        match self {
            Self::Node(node) => node,
            Self::Token(token) => Node::text(token.text),
        }
    }
}

/// Apply delimiter processors to every inline sibling list of `nodes`.
///
/// Children are processed before their parent list, so a custom node built
/// from a span wraps already-processed content.
pub(crate) fn process_inlines(
    nodes: Vec<Node>,
    processors: &[Arc<dyn DelimiterProcessor>],
) -> Vec<Node> {
    if processors.is_empty() {
        return nodes;
    }

    let nodes = nodes
        .into_iter()
        .map(|mut node| {
            if !node.children.is_empty() {
                node.children = process_inlines(mem::take(&mut node.children), processors);
            }
            node
        })
        .collect();

    let items = tokenize(merge_text(nodes), processors);
    let items = match_delimiters(items, processors);
    merge_text(items.into_iter().map(Item::into_node).collect())
}

/// Merge adjacent text nodes and drop empty ones.
fn merge_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let NodeKind::Text(text) = &node.kind {
            if text.is_empty() {
                continue;
            }
            if let Some(NodeKind::Text(previous)) = merged.last_mut().map(|n| &mut n.kind) {
                previous.push_str(text);
                continue;
            }
        }
        merged.push(node);
    }
    merged
}

/// Split text nodes into plain text and delimiter tokens.
///
/// Openers are checked in registration order before closers.
fn tokenize(nodes: Vec<Node>, processors: &[Arc<dyn DelimiterProcessor>]) -> Vec<Item> {
    let mut items = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node.kind {
            NodeKind::Text(text) => scan_text(&text, processors, &mut items),
            _ => items.push(Item::Node(node)),
        }
    }
    items
}

fn scan_text(text: &str, processors: &[Arc<dyn DelimiterProcessor>], items: &mut Vec<Item>) {
    let mut plain_start = 0;
    let mut byte = 0;
    let mut position = 0;

    while byte < text.len() {
        let rest = &text[byte..];
        if let Some((token_len, token)) = match_token(rest, position, processors) {
            if plain_start < byte {
                items.push(Item::Node(Node::text(&text[plain_start..byte])));
            }
            position += rest[..token_len].chars().count();
            byte += token_len;
            plain_start = byte;
            items.push(Item::Token(token));
        } else {
            let ch_len = rest.chars().next().map_or(1, char::len_utf8);
            byte += ch_len;
            position += 1;
        }
    }

    if plain_start < text.len() {
        items.push(Item::Node(Node::text(&text[plain_start..])));
    }
}

fn match_token(
    rest: &str,
    position: usize,
    processors: &[Arc<dyn DelimiterProcessor>],
) -> Option<(usize, Token)> {
    let opener = processors
        .iter()
        .position(|p| rest.starts_with(p.spec().opening()));

    let (text, opens) = if let Some(index) = opener {
        (processors[index].spec().opening(), Some(index))
    } else {
        let closing = processors
            .iter()
            .map(|p| p.spec().closing())
            .find(|closing| rest.starts_with(closing))?;
        (closing, None)
    };

    let closes = processors.iter().any(|p| p.spec().closing() == text);
    let width = opens.map_or_else(
        || {
            processors
                .iter()
                .filter(|p| p.spec().closing() == text)
                .map(|p| p.spec().width())
                .max()
                .unwrap_or(0)
        },
        |index| processors[index].spec().width(),
    );

    let token = Token {
        text: text.to_owned(),
        run: DelimiterRun {
            character: text.chars().next().unwrap_or('\0'),
            length: width,
            position,
        },
        opens,
        closes,
    };
    Some((text.len(), token))
}

/// Pair openers with closers and replace matched spans.
fn match_delimiters(items: Vec<Item>, processors: &[Arc<dyn DelimiterProcessor>]) -> Vec<Item> {
    let mut out: Vec<Item> = Vec::with_capacity(items.len());
    // (index into `out`, processor index, opener run)
    let mut openers: Vec<(usize, usize, DelimiterRun)> = Vec::new();

    for item in items {
        let token = match item {
            Item::Token(token) => token,
            node @ Item::Node(_) => {
                out.push(node);
                continue;
            }
        };

        if token.closes {
            let candidate = openers
                .iter()
                .rposition(|&(_, p, _)| processors[p].spec().closing() == token.text);

            if let Some(stack_index) = candidate {
                let (out_index, p, opener_run) = openers[stack_index];
                let processor = &processors[p];
                let used = processor.decide_usable_length(&opener_run, &token.run);

                if used > 0 {
                    let children = out
                        .drain(out_index..)
                        .skip(1)
                        .map(Item::into_node)
                        .collect();
                    let node = processor.build(&opener_run, &token.run, used, merge_text(children));
                    openers.truncate(stack_index);
                    out.push(Item::Node(node));
                    continue;
                }
            }
        }

        if let Some(p) = token.opens {
            openers.push((out.len(), p, token.run));
        }
        out.push(Item::Token(token));
    }

    out
}
