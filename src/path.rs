//! Paths and path segments
//!
//! A path is a list of segments, absolute when it starts at the root. A
//! segment is a name plus a 1-based same-name-sibling index; the special names
//! `.` and `..` denote self and parent references.

use crate::error::{RepositoryError, Result};
use crate::types::Name;
use std::fmt;
use std::str::FromStr;

const SELF_REFERENCE: &str = ".";
const PARENT_REFERENCE: &str = "..";

/// One path segment: name and same-name-sibling index
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    name: Name,
    index: usize,
}

impl Segment {
    pub fn new(name: Name, index: usize) -> Self {
        debug_assert!(index >= 1);
        Segment { name, index }
    }

    /// Segment with the default index of 1
    pub fn named(name: impl Into<Name>) -> Self {
        Segment::new(name.into(), 1)
    }

    pub fn self_reference() -> Self {
        Segment::new(Name::from_static(SELF_REFERENCE), 1)
    }

    pub fn parent_reference() -> Self {
        Segment::new(Name::from_static(PARENT_REFERENCE), 1)
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_self_reference(&self) -> bool {
        self.name.as_str() == SELF_REFERENCE
    }

    pub fn is_parent_reference(&self) -> bool {
        self.name.as_str() == PARENT_REFERENCE
    }

    fn parse(text: &str) -> Result<Segment> {
        if text == SELF_REFERENCE {
            return Ok(Segment::self_reference());
        }
        if text == PARENT_REFERENCE {
            return Ok(Segment::parent_reference());
        }
        match text.strip_suffix(']').and_then(|t| t.split_once('[')) {
            Some((name, index)) => {
                let index: usize = index.parse().map_err(|_| {
                    RepositoryError::InvalidPath(format!("invalid index in segment '{}'", text))
                })?;
                if name.is_empty() || index == 0 {
                    return Err(RepositoryError::InvalidPath(format!(
                        "invalid segment '{}'",
                        text
                    )));
                }
                Ok(Segment::new(Name::from(name), index))
            }
            None => {
                if text.contains('[') || text.contains(']') {
                    return Err(RepositoryError::InvalidPath(format!(
                        "invalid segment '{}'",
                        text
                    )));
                }
                Ok(Segment::named(text))
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 1 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}[{}]", self.name, self.index)
        }
    }
}

/// Absolute or relative path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    absolute: bool,
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self {
        Path {
            absolute: true,
            segments: Vec::new(),
        }
    }

    pub fn relative(segments: Vec<Segment>) -> Self {
        Path {
            absolute: false,
            segments,
        }
    }

    pub fn absolute(segments: Vec<Segment>) -> Self {
        Path {
            absolute: true,
            segments,
        }
    }

    pub fn parse(text: &str) -> Result<Path> {
        let absolute = text.starts_with('/');
        let segments = text
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Path { absolute, segments })
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn is_root(&self) -> bool {
        self.absolute && self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Parent path; `None` for the root and for empty relative paths
    pub fn parent(&self) -> Option<Path> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Path {
            absolute: self.absolute,
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn child(&self, segment: Segment) -> Path {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Path {
            absolute: self.absolute,
            segments,
        }
    }

    pub fn child_named(&self, name: impl Into<Name>) -> Path {
        self.child(Segment::named(name))
    }

    /// A normalized path has no self references, and parent references only
    /// as a leading run of a relative path.
    pub fn is_normalized(&self) -> bool {
        let mut seen_name = false;
        for segment in &self.segments {
            if segment.is_self_reference() {
                return false;
            }
            if segment.is_parent_reference() {
                if seen_name || self.absolute {
                    return false;
                }
            } else {
                seen_name = true;
            }
        }
        true
    }

    pub fn normalized(&self) -> Result<Path> {
        let mut segments: Vec<Segment> = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            if segment.is_self_reference() {
                continue;
            }
            if segment.is_parent_reference() {
                match segments.last() {
                    Some(last) if !last.is_parent_reference() => {
                        segments.pop();
                    }
                    _ if self.absolute => {
                        return Err(RepositoryError::InvalidPath(format!(
                            "{} refers above the root",
                            self
                        )));
                    }
                    _ => segments.push(segment.clone()),
                }
                continue;
            }
            segments.push(segment.clone());
        }
        Ok(Path {
            absolute: self.absolute,
            segments,
        })
    }

    /// Express an absolute path relative to an absolute ancestor
    pub fn relative_to(&self, ancestor: &Path) -> Result<Path> {
        if !self.absolute || !ancestor.absolute || !self.segments.starts_with(&ancestor.segments)
        {
            return Err(RepositoryError::InvalidPath(format!(
                "{} is not a descendant of {}",
                self, ancestor
            )));
        }
        Ok(Path::relative(self.segments[ancestor.segments.len()..].to_vec()))
    }

    /// Resolve a relative path against this one; absolute paths are returned as is
    pub fn resolve(&self, relative: &Path) -> Result<Path> {
        if relative.absolute {
            return relative.normalized();
        }
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Path {
            absolute: self.absolute,
            segments,
        }
        .normalized()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute && self.segments.is_empty() {
            return f.write_str("/");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 || self.absolute {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self> {
        Path::parse(s)
    }
}
