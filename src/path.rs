// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// An object attribute, i.e. a message field.
    Attr(String),
    /// A list position.
    Index(usize),
    /// A map entry with a string key.
    Key(String),
    /// A set element, or a collection element whose key is not known.
    Element,
}

/// Root-relative location of a value within a nested value or message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path(Vec<PathStep>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, step: PathStep) {
        self.0.push(step);
    }
}

impl From<Vec<PathStep>> for Path {
    fn from(steps: Vec<PathStep>) -> Self {
        Path(steps)
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathStep::Attr(name) => write!(f, ".{name}"),
            PathStep::Index(i) => write!(f, "[{i}]"),
            PathStep::Key(key) => write!(f, "[{key:?}]"),
            PathStep::Element => f.write_str("[*]"),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str(".");
        }
        for step in &self.0 {
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Step<'a> {
    Root,
    Attr(&'a str),
    Index(usize),
    Key(&'a str),
    Element,
}

/// Path of the node currently being visited by a tree walk.
///
/// Each recursive call links a new cursor onto its parent's, so siblings never
/// observe each other's steps and nothing is allocated until an error needs an
/// owned [`Path`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    parent: Option<&'a Cursor<'a>>,
    step: Step<'a>,
}

impl<'a> Cursor<'a> {
    pub(crate) const ROOT: Cursor<'static> = Cursor {
        parent: None,
        step: Step::Root,
    };

    fn child<'b>(&'b self, step: Step<'b>) -> Cursor<'b> {
        Cursor {
            parent: Some(self),
            step,
        }
    }

    pub(crate) fn attr<'b>(&'b self, name: &'b str) -> Cursor<'b> {
        self.child(Step::Attr(name))
    }

    pub(crate) fn index(&self, index: usize) -> Cursor<'_> {
        self.child(Step::Index(index))
    }

    pub(crate) fn key<'b>(&'b self, key: &'b str) -> Cursor<'b> {
        self.child(Step::Key(key))
    }

    pub(crate) fn element(&self) -> Cursor<'_> {
        self.child(Step::Element)
    }

    pub(crate) fn to_path(&self) -> Path {
        let mut steps = Vec::new();
        let mut cursor = Some(self);
        while let Some(c) = cursor {
            match c.step {
                Step::Root => {}
                Step::Attr(name) => steps.push(PathStep::Attr(name.to_string())),
                Step::Index(i) => steps.push(PathStep::Index(i)),
                Step::Key(key) => steps.push(PathStep::Key(key.to_string())),
                Step::Element => steps.push(PathStep::Element),
            }
            cursor = c.parent;
        }
        steps.reverse();
        Path(steps)
    }
}

impl fmt::Display for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_path(), f)
    }
}
