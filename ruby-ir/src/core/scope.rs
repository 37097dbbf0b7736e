//! Lexical scopes and the scope tree
//!
//! Scopes live in a [`ScopeTree`] arena and refer to each other through
//! [`ScopeRef`] handles. The root is always the first scope of the tree; every
//! other scope is added under an existing parent, so the parent/child links
//! never form a cycle.

use crate::core::instructions::Instr;
use crate::error::{IrError, Result};
use bitflags::bitflags;
use once_cell::sync::OnceCell;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// Handle to a scope inside one [`ScopeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeRef(u32);

impl ScopeRef {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn id(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScopeKind {
    ScriptBody = 0,
    InstanceMethod = 1,
    ClassMethod = 2,
    ClassBody = 3,
    ModuleBody = 4,
    MetaclassBody = 5,
    Closure = 6,
    ForLoop = 7,
    EvalScript = 8,
}

impl ScopeKind {
    pub fn from_byte(byte: u8) -> Result<Self> {
        let kind = match byte {
            0 => ScopeKind::ScriptBody,
            1 => ScopeKind::InstanceMethod,
            2 => ScopeKind::ClassMethod,
            3 => ScopeKind::ClassBody,
            4 => ScopeKind::ModuleBody,
            5 => ScopeKind::MetaclassBody,
            6 => ScopeKind::Closure,
            7 => ScopeKind::ForLoop,
            8 => ScopeKind::EvalScript,
            code => {
                return Err(IrError::InvalidCode {
                    what: "scope kind",
                    code,
                });
            }
        };
        Ok(kind)
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }

    pub fn is_closure(&self) -> bool {
        matches!(self, ScopeKind::Closure | ScopeKind::ForLoop)
    }

    pub fn is_method(&self) -> bool {
        matches!(self, ScopeKind::InstanceMethod | ScopeKind::ClassMethod)
    }

    pub fn is_module_body(&self) -> bool {
        matches!(
            self,
            ScopeKind::ClassBody | ScopeKind::ModuleBody | ScopeKind::MetaclassBody
        )
    }
}

bitflags! {
    /// Feature flags computed by the front end for each scope
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ScopeFlags: u32 {
        const HAS_BREAK_INSTRS = 1 << 0;
        const HAS_LOOPS = 1 << 1;
        const HAS_NONLOCAL_RETURNS = 1 << 2;
        const RECEIVES_CLOSURE_ARG = 1 << 3;
        const RECEIVES_KEYWORD_ARGS = 1 << 4;
        const ACCESSES_PARENTS_LOCAL_VARIABLES = 1 << 5;
        const MAY_USE_REFINEMENTS = 1 << 6;
        const CAN_CAPTURE_CALLERS_BINDING = 1 << 7;
        const CAN_RECEIVE_BREAKS = 1 << 8;
        const CAN_RECEIVE_NONLOCAL_RETURNS = 1 << 9;
        const USES_ZSUPER = 1 << 10;
        const NEEDS_CODE_COVERAGE = 1 << 11;
        const USES_EVAL = 1 << 12;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum StaticScopeKind {
    #[default]
    Local = 0,
    Block = 1,
    Eval = 2,
}

impl StaticScopeKind {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(StaticScopeKind::Local),
            1 => Ok(StaticScopeKind::Block),
            2 => Ok(StaticScopeKind::Eval),
            code => Err(IrError::InvalidCode {
                what: "static scope kind",
                code,
            }),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Shape of a rest parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Rest {
    #[default]
    None = 0,
    /// `*args`
    Norm = 1,
    /// trailing comma in block params: `|a,|`
    Optional = 2,
    /// bare `*`
    Anon = 3,
    /// `|*|` in blocks
    Star = 4,
}

impl Rest {
    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Rest::None),
            1 => Ok(Rest::Norm),
            2 => Ok(Rest::Optional),
            3 => Ok(Rest::Anon),
            4 => Ok(Rest::Star),
            code => Err(IrError::InvalidCode {
                what: "rest kind",
                code,
            }),
        }
    }

    pub fn to_byte(self) -> u8 {
        self as u8
    }
}

/// Parameter signature of a method or block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    pub pre: u32,
    pub opt: u32,
    pub post: u32,
    pub rest: Rest,
    pub kwargs: u32,
    pub required_kwargs: u32,
    /// Slot of the `**kwrest` parameter
    pub keyword_rest: Option<u32>,
}

impl Signature {
    pub const NO_ARGUMENTS: Signature = Signature {
        pre: 0,
        opt: 0,
        post: 0,
        rest: Rest::None,
        kwargs: 0,
        required_kwargs: 0,
        keyword_rest: None,
    };

    pub fn required(&self) -> u32 {
        self.pre + self.post
    }

    pub fn has_keywords(&self) -> bool {
        self.kwargs > 0 || self.keyword_rest.is_some()
    }
}

/// Static-scope descriptor: the variable table of a scope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StaticScope {
    pub kind: StaticScopeKind,
    pub variables: Vec<String>,
    pub first_keyword_index: Option<u32>,
    pub signature: Signature,
}

impl StaticScope {
    pub fn new(kind: StaticScopeKind, variables: Vec<String>) -> Self {
        Self {
            kind,
            variables,
            first_keyword_index: None,
            signature: Signature::NO_ARGUMENTS,
        }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn with_first_keyword_index(mut self, index: u32) -> Self {
        self.first_keyword_index = Some(index);
        self
    }
}

/// Deferred source of a scope's instruction list.
///
/// Called at most once per scope on success; the produced list is memoized.
pub trait InstrLoader: Send + Sync + fmt::Debug {
    fn load(&self) -> Result<Vec<Instr>>;
}

#[derive(Clone)]
struct InstrList {
    instrs: OnceCell<Vec<Instr>>,
    loader: Option<Arc<dyn InstrLoader>>,
}

impl InstrList {
    fn ready(instrs: Vec<Instr>) -> Self {
        Self {
            instrs: OnceCell::with_value(instrs),
            loader: None,
        }
    }

    fn deferred(loader: Arc<dyn InstrLoader>) -> Self {
        Self {
            instrs: OnceCell::new(),
            loader: Some(loader),
        }
    }

    fn get(&self) -> Result<&[Instr]> {
        let instrs = self.instrs.get_or_try_init(|| match &self.loader {
            Some(loader) => loader.load(),
            None => Ok(Vec::new()),
        })?;
        Ok(instrs)
    }
}

impl fmt::Debug for InstrList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instrs.get() {
            Some(instrs) => f.debug_list().entries(instrs).finish(),
            None => f.write_str("<deferred>"),
        }
    }
}

/// A lexical code unit owning an instruction list
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Method/class/module name; the source file name for the root scope
    pub name: String,
    pub line: u32,
    pub static_scope: StaticScope,
    pub flags: ScopeFlags,
    pub temp_variable_count: u32,
    pub next_label: u32,
    parent: Option<ScopeRef>,
    children: Vec<ScopeRef>,
    instrs: InstrList,
}

impl Scope {
    pub fn new(
        kind: ScopeKind,
        name: impl Into<String>,
        line: u32,
        static_scope: StaticScope,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            line,
            static_scope,
            flags: ScopeFlags::empty(),
            temp_variable_count: 0,
            next_label: 0,
            parent: None,
            children: Vec::new(),
            instrs: InstrList::ready(Vec::new()),
        }
    }

    pub fn with_flags(mut self, flags: ScopeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_counters(mut self, temp_variable_count: u32, next_label: u32) -> Self {
        self.temp_variable_count = temp_variable_count;
        self.next_label = next_label;
        self
    }

    pub fn with_instrs(mut self, instrs: Vec<Instr>) -> Self {
        self.instrs = InstrList::ready(instrs);
        self
    }

    /// Replace the instruction list with one produced on first access.
    pub fn with_loader(mut self, loader: Arc<dyn InstrLoader>) -> Self {
        self.instrs = InstrList::deferred(loader);
        self
    }

    pub fn parent(&self) -> Option<ScopeRef> {
        self.parent
    }

    pub fn children(&self) -> &[ScopeRef] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The instruction list, materializing it through the deferred loader on
    /// first call. Later calls return the same list without reloading.
    pub fn instrs(&self) -> Result<&[Instr]> {
        self.instrs.get()
    }

    /// Mutable access for the front end; a deferred list is materialized first.
    pub fn instrs_mut(&mut self) -> Result<&mut Vec<Instr>> {
        self.instrs.get()?;
        self.instrs
            .instrs
            .get_mut()
            .ok_or_else(|| IrError::InvalidTree("instruction list vanished".to_string()))
    }

    pub fn push_instr(&mut self, instr: Instr) -> Result<()> {
        self.instrs_mut()?.push(instr);
        Ok(())
    }

    /// Whether the instruction list is materialized
    pub fn is_loaded(&self) -> bool {
        self.instrs.instrs.get().is_some()
    }
}

/// Arena of scopes rooted at the first entry
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new(mut root: Scope) -> Self {
        root.parent = None;
        root.children.clear();
        Self { scopes: vec![root] }
    }

    pub fn root(&self) -> ScopeRef {
        ScopeRef(0)
    }

    /// Add `scope` as the last lexical child of `parent`.
    pub fn add_child(&mut self, parent: ScopeRef, mut scope: Scope) -> Result<ScopeRef> {
        if parent.index() >= self.scopes.len() {
            return Err(IrError::UnknownScope(parent));
        }
        let id = u32::try_from(self.scopes.len())
            .map_err(|_| IrError::InvalidTree("too many scopes".to_string()))?;
        let child = ScopeRef(id);

        scope.parent = Some(parent);
        scope.children.clear();
        self.scopes.push(scope);
        self.scopes[parent.index()].children.push(child);
        Ok(child)
    }

    pub fn get(&self, scope: ScopeRef) -> Result<&Scope> {
        self.scopes
            .get(scope.index())
            .ok_or(IrError::UnknownScope(scope))
    }

    pub fn get_mut(&mut self, scope: ScopeRef) -> Result<&mut Scope> {
        self.scopes
            .get_mut(scope.index())
            .ok_or(IrError::UnknownScope(scope))
    }

    pub fn contains(&self, scope: ScopeRef) -> bool {
        scope.index() < self.scopes.len()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// A tree always holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Scopes in arena (insertion) order
    pub fn iter(&self) -> impl Iterator<Item = (ScopeRef, &Scope)> + '_ {
        self.scopes
            .iter()
            .enumerate()
            .map(|(idx, scope)| (ScopeRef(idx as u32), scope))
    }

    /// Pre-order walk from the root: a scope before its lexical children,
    /// children in insertion order.
    pub fn depth_first(&self) -> Vec<ScopeRef> {
        let mut order = Vec::with_capacity(self.scopes.len());
        let mut stack = vec![self.root()];
        while let Some(scope) = stack.pop() {
            order.push(scope);
            stack.extend(self.scopes[scope.index()].children.iter().rev().copied());
        }
        order
    }

    /// Source file name recorded on the root scope
    pub fn file_name(&self) -> &str {
        &self.scopes[0].name
    }

    /// Lexical nesting depth of `scope` (the root is at depth 0)
    pub fn depth_of(&self, scope: ScopeRef) -> Result<u32> {
        let mut depth = 0;
        let mut current = self.get(scope)?;
        while let Some(parent) = current.parent {
            depth += 1;
            current = self.get(parent)?;
        }
        Ok(depth)
    }

    /// Force every deferred instruction list, stopping at the first failure.
    pub fn materialize_all(&self) -> Result<usize> {
        let mut total = 0;
        for scope in &self.scopes {
            total += scope.instrs()?.len();
        }
        Ok(total)
    }
}

impl Index<ScopeRef> for ScopeTree {
    type Output = Scope;

    fn index(&self, scope: ScopeRef) -> &Scope {
        &self.scopes[scope.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instructions::InstrKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn script() -> Scope {
        Scope::new(ScopeKind::ScriptBody, "main.rb", 1, StaticScope::default())
    }

    #[derive(Debug, Default)]
    struct CountingLoader {
        calls: AtomicUsize,
    }

    impl InstrLoader for CountingLoader {
        fn load(&self) -> Result<Vec<Instr>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Instr::new(InstrKind::Nop)])
        }
    }

    #[test]
    fn test_scope_kind_codes() {
        for byte in 0..=8u8 {
            assert_eq!(ScopeKind::from_byte(byte).unwrap().to_byte(), byte);
        }
        assert!(ScopeKind::from_byte(9).is_err());
        assert!(ScopeKind::Closure.is_closure());
        assert!(ScopeKind::ClassMethod.is_method());
    }

    #[test]
    fn test_deferred_loader_runs_once() {
        let loader = Arc::new(CountingLoader::default());
        let scope = script().with_loader(loader.clone());

        assert!(!scope.is_loaded());
        assert_eq!(scope.instrs().unwrap().len(), 1);
        assert_eq!(scope.instrs().unwrap().len(), 1);
        assert!(scope.is_loaded());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_push_instr_materializes_deferred_list() {
        let mut scope = script().with_loader(Arc::new(CountingLoader::default()));
        scope.push_instr(Instr::new(InstrKind::PopFrame)).unwrap();
        assert_eq!(scope.instrs().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let mut tree = ScopeTree::new(script());
        let err = tree
            .add_child(ScopeRef::new(7), script())
            .unwrap_err();
        assert!(matches!(err, IrError::UnknownScope(r) if r == ScopeRef::new(7)));
    }
}
