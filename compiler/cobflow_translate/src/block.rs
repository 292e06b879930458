//! Builds the nested blocks of `IF`, `EVALUATE` and `PERFORM ... END-PERFORM`.

use cobflow_arena::ID;
use cobflow_element::{Branch, Element, Kind, LoopHeader, Sequence};

use crate::{diagnostic::UnbalancedBlock, UnitTranslator};

/// An open block and the sequence its statements go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Block {
    Alternative {
        then: ID<Sequence>,
        otherwise: ID<Sequence>,
        in_otherwise: bool,
    },

    /// `current` is [`None`] until the first `WHEN`.
    Selection {
        element: ID<Element>,
        current: Option<ID<Sequence>>,
    },

    Loop {
        body: ID<Sequence>,
    },
}

impl Block {
    const fn target(&self) -> Option<ID<Sequence>> {
        match self {
            Self::Alternative { then, otherwise, in_otherwise } => {
                Some(if *in_otherwise { *otherwise } else { *then })
            }
            Self::Selection { current, .. } => *current,
            Self::Loop { body } => Some(*body),
        }
    }
}

fn is_other(labels: &[String]) -> bool {
    match labels {
        [] => true,
        [label] => label.trim().eq_ignore_ascii_case("OTHER"),
        _ => false,
    }
}

impl UnitTranslator<'_> {
    /// Returns the sequence the next statement goes to.
    pub(crate) fn current_sequence(&self) -> ID<Sequence> {
        self.blocks.iter().rev().find_map(Block::target).unwrap_or(self.body)
    }

    /// Opens an `IF`. A condition name is replaced by its expression.
    pub fn begin_alternative(&mut self, condition: &str) {
        let condition = self.expand_condition(condition);
        let then = self.tree.new_sequence();
        let otherwise = self.tree.new_sequence();

        self.append(Element::new(Kind::Alternative { condition, then, otherwise }));
        self.blocks.push(Block::Alternative { then, otherwise, in_otherwise: false });
    }

    /// Switches the innermost `IF` to its else-branch.
    pub fn otherwise(&mut self) {
        match self.blocks.last_mut() {
            Some(Block::Alternative { in_otherwise, .. }) if !*in_otherwise => {
                *in_otherwise = true;
            }
            _ => self.unmatched("otherwise"),
        }
    }

    /// Opens an `EVALUATE`.
    pub fn begin_selection(&mut self, subject: impl Into<String>) {
        let element = self.append(Element::new(Kind::Selection {
            subject: subject.into(),
            branches: Vec::new(),
            default: None,
        }));
        self.blocks.push(Block::Selection { element, current: None });
    }

    /// Starts a branch of the innermost `EVALUATE`.
    pub fn when(&mut self, labels: Vec<String>) {
        let Some(Block::Selection { element, .. }) = self.blocks.last().copied() else {
            self.unmatched("when");
            return;
        };

        let body = self.tree.new_sequence();
        if let Kind::Selection { branches, default, .. } =
            self.tree.element_mut(element).kind_mut()
        {
            if is_other(&labels) {
                *default = Some(body);
            } else {
                branches.push(Branch { labels, body });
            }
        }

        if let Some(Block::Selection { current, .. }) = self.blocks.last_mut() {
            *current = Some(body);
        }
    }

    /// Opens a loop.
    pub fn begin_loop(&mut self, header: LoopHeader) {
        let header = match header {
            LoopHeader::While(condition) => {
                LoopHeader::While(self.expand_condition(&condition))
            }
            LoopHeader::Until(condition) => {
                LoopHeader::Until(self.expand_condition(&condition))
            }
            header => header,
        };

        let body = self.tree.new_sequence();
        self.append(Element::new(Kind::Loop { header, body }));
        self.blocks.push(Block::Loop { body });
    }

    /// Closes the innermost block.
    pub fn end(&mut self) {
        if self.blocks.pop().is_none() {
            self.unmatched("end");
        }
    }

    /// Closes every open block, reporting them if there were any.
    pub(crate) fn close_blocks(&mut self) {
        if self.blocks.is_empty() {
            return;
        }

        self.handler.receive(Box::new(UnbalancedBlock::Unclosed {
            unit: self.name.clone(),
            blocks: self.blocks.len(),
        }));
        self.blocks.clear();
    }

    fn unmatched(&self, event: &str) {
        self.handler.receive(Box::new(UnbalancedBlock::Unmatched {
            unit: self.name.clone(),
            event: event.to_owned(),
        }));
    }
}
