#![allow(dead_code)]

use num_bigint::BigInt;
use ruby_ir::*;

pub fn lbl(id: u32) -> Label {
    Label::new("LBL", id)
}

/// Attach a fresh temporary when the operation binds a result.
pub fn with_result(kinds: Vec<InstrKind>) -> Vec<Instr> {
    let mut next_temp = 0;
    kinds
        .into_iter()
        .map(|kind| {
            if kind.operation().has_result() {
                next_temp += 1;
                Instr::with_result(Variable::temp(next_temp - 1), kind)
            } else {
                Instr::new(kind)
            }
        })
        .collect()
}

/// One operand of every shape, including composites nested three deep.
pub fn every_operand(closure: ScopeRef) -> Vec<Operand> {
    vec![
        Operand::Nil,
        Operand::Fixnum(-7),
        Operand::Fixnum(i64::MAX),
        Operand::Bignum(BigInt::from(u64::MAX) * BigInt::from(-3)),
        Operand::Float(-0.25),
        Operand::Boolean(true),
        Operand::UnboxedBoolean(false),
        Operand::UnboxedFixnum(1 << 40),
        Operand::UnboxedFloat(1e300),
        Operand::string("héllo"),
        Operand::Str(ByteStr::binary(vec![0x00, 0xFF, 0x80])),
        Operand::frozen_string("frozen"),
        Operand::symbol("sym"),
        Operand::DynamicSymbol(Box::new(Operand::CompoundString {
            pieces: vec![Operand::string("dyn_"), Operand::temp(3)],
            encoding: Some(Encoding::Utf8),
        })),
        Operand::Regexp {
            source: ByteStr::new("^a.b$", Encoding::UsAscii),
            options: RegexpOptions::IGNORECASE | RegexpOptions::MULTILINE,
        },
        Operand::StandardError,
        Operand::UndefinedValue,
        Operand::GlobalVariable("$stdout".into()),
        Operand::NthRef(2),
        Operand::Backref(b'&'),
        Operand::local("x", 1, 0),
        Operand::temp(200),
        Operand::Temp(TemporaryVariable::new(TempKind::Boolean, 1)),
        Operand::Temp(TemporaryVariable::new(TempKind::Fixnum, 2)),
        Operand::Temp(TemporaryVariable::new(TempKind::Float, 3)),
        Operand::Temp(TemporaryVariable::new(TempKind::Closure, 4)),
        Operand::SelfValue,
        Operand::Array(vec![
            Operand::Fixnum(1),
            Operand::Array(vec![Operand::splat(Operand::Array(vec![Operand::Nil]))]),
        ]),
        Operand::Hash(vec![
            (Operand::symbol("a"), Operand::Fixnum(1)),
            (
                Operand::string("nested"),
                Operand::Hash(vec![(
                    Operand::symbol("b"),
                    Operand::Array(vec![Operand::splat(Operand::temp(0))]),
                )]),
            ),
        ]),
        Operand::splat(Operand::splat(Operand::splat(Operand::local("rest", 0, 2)))),
        Operand::CompoundString {
            pieces: vec![
                Operand::string("x = "),
                Operand::AsString(Box::new(Operand::CompoundString {
                    pieces: vec![Operand::AsString(Box::new(Operand::temp(5)))],
                    encoding: None,
                })),
            ],
            encoding: Some(Encoding::ShiftJis),
        },
        Operand::AsString(Box::new(Operand::Fixnum(9))),
        Operand::Range {
            begin: Box::new(Operand::Fixnum(1)),
            end: Box::new(Operand::temp(6)),
            exclusive: true,
        },
        Operand::CurrentScope { depth: 0 },
        Operand::ScopeModule { depth: 2 },
        Operand::WrappedClosure(closure),
        Operand::Label(lbl(12)),
    ]
}

/// One instruction per operation, in operation-code order.
pub fn every_instruction(body: ScopeRef, method: ScopeRef, closure: ScopeRef) -> Vec<Instr> {
    let call = CallBase::new(CallType::Normal, "push", Operand::temp(1))
        .with_args(vec![Operand::Fixnum(1), Operand::splat(Operand::temp(2))]);
    let block_call = CallBase::new(CallType::Functional, "each", Operand::SelfValue)
        .with_closure(Operand::WrappedClosure(closure));

    with_result(vec![
        // Control flow
        InstrKind::Nop,
        InstrKind::Jump { target: lbl(1) },
        InstrKind::Label { label: lbl(1) },
        InstrKind::BEq {
            arg1: Operand::temp(0),
            arg2: Operand::Nil,
            target: lbl(2),
        },
        InstrKind::BNe {
            arg1: Operand::temp(0),
            arg2: Operand::Fixnum(3),
            target: lbl(2),
        },
        InstrKind::BFalse {
            arg: Operand::temp(0),
            target: lbl(3),
        },
        InstrKind::BTrue {
            arg: Operand::UnboxedBoolean(true),
            target: lbl(3),
        },
        InstrKind::BNil {
            arg: Operand::temp(1),
            target: lbl(4),
        },
        InstrKind::BUndef {
            arg: Operand::local("opt", 0, 1),
            target: lbl(4),
        },
        InstrKind::Return {
            value: Operand::temp(0),
        },
        InstrKind::Break {
            value: Operand::Nil,
            scope_name: "each".into(),
        },
        InstrKind::NonlocalReturn {
            value: Operand::Fixnum(1),
            method_name: "find".into(),
        },
        InstrKind::Throw {
            exception: Operand::temp(9),
        },
        InstrKind::ThreadPoll { on_back_edge: true },
        InstrKind::LineNum { line: 1_000 },
        InstrKind::ClosureReturn {
            value: Operand::SelfValue,
        },
        // Values and builders
        InstrKind::Copy {
            source: Operand::local("a", 0, 0),
        },
        InstrKind::LoadConst {
            value: Operand::Fixnum(42),
        },
        InstrKind::Not {
            arg: Operand::temp(0),
        },
        InstrKind::BuildCompoundArray {
            appending: Operand::temp(0),
            appended: Operand::Array(vec![Operand::Nil]),
            is_args_push: true,
        },
        InstrKind::BuildCompoundString {
            encoding: Some(Encoding::Utf8),
            pieces: vec![Operand::string("a"), Operand::temp(1)],
        },
        InstrKind::BuildDynRegexp {
            pieces: vec![Operand::string("^"), Operand::temp(2)],
            options: RegexpOptions::EXTENDED | RegexpOptions::ONCE,
        },
        InstrKind::BuildRange {
            begin: Operand::Fixnum(0),
            end: Operand::temp(1),
            exclusive: false,
        },
        InstrKind::BuildSplat {
            array: Operand::temp(3),
        },
        InstrKind::BacktickString {
            pieces: vec![Operand::string("ls")],
        },
        InstrKind::ToAry {
            array: Operand::temp(4),
        },
        InstrKind::Eqq {
            arg1: Operand::temp(5),
            arg2: Operand::temp(6),
        },
        InstrKind::RescueEqq {
            arg1: Operand::StandardError,
            arg2: Operand::temp(7),
        },
        InstrKind::ReifyClosure {
            source: Operand::Temp(TemporaryVariable::new(TempKind::Closure, 0)),
        },
        InstrKind::GetEncoding {
            encoding: Encoding::Ascii8Bit,
        },
        // Calls
        InstrKind::Call(call.clone()),
        InstrKind::NoResultCall(block_call.clone()),
        InstrKind::AttrAssign {
            receiver: Operand::temp(0),
            name: "value=".into(),
            args: vec![Operand::Fixnum(5)],
        },
        InstrKind::ClassSuper(
            CallBase::new(CallType::Super, "initialize", Operand::temp(0))
                .with_args(vec![Operand::Nil]),
        ),
        InstrKind::InstanceSuper(block_call),
        InstrKind::UnresolvedSuper {
            call_type: CallType::Super,
            receiver: Operand::SelfValue,
            args: vec![],
            closure: Some(Operand::Nil),
        },
        InstrKind::ZSuper {
            receiver: Operand::SelfValue,
            args: vec![Operand::local("a", 0, 0)],
            closure: None,
        },
        InstrKind::Yield {
            block: Operand::Temp(TemporaryVariable::new(TempKind::Closure, 0)),
            arg: Operand::UndefinedValue,
            unwrap_array: false,
        },
        InstrKind::RuntimeHelper {
            helper: RuntimeHelper::IsDefinedMethod,
            args: vec![Operand::SelfValue, Operand::frozen_string("foo")],
        },
        InstrKind::BlockGiven {
            block: Operand::Temp(TemporaryVariable::new(TempKind::Closure, 0)),
        },
        InstrKind::CheckForLje { maybe_lambda: true },
        InstrKind::Lambda {
            body: Operand::WrappedClosure(closure),
            file: "sample.rb".into(),
            line: 12,
        },
        // Argument receiving
        InstrKind::RecvSelf,
        InstrKind::RecvPreReqdArg { index: 0 },
        InstrKind::RecvPostReqdArg {
            index: 3,
            pre_reqd: 1,
            post_reqd: 1,
        },
        InstrKind::RecvOptArg {
            required_args: 1,
            pre_args: 1,
            index: 1,
        },
        InstrKind::RecvRestArg {
            required: 2,
            index: 2,
        },
        InstrKind::RecvKwArg {
            name: "key".into(),
            required: 2,
        },
        InstrKind::RecvKwRestArg { required: 2 },
        InstrKind::RecvClosure,
        InstrKind::RecvRubyExc,
        InstrKind::RecvJrubyExc,
        InstrKind::CheckArity {
            required: 1,
            opt: 1,
            rest: true,
            receives_keywords: true,
        },
        InstrKind::CheckArgsArrayArity {
            args_array: Operand::temp(0),
            required: 2,
            opt: 0,
            rest: false,
        },
        InstrKind::RaiseArgumentError {
            required: 1,
            opt: 0,
            rest: -1,
            num_args: 3,
        },
        // Multiple assignment
        InstrKind::MasgnOpt {
            array: Operand::temp(0),
            index: 1,
            min_args_length: 2,
        },
        InstrKind::MasgnReqd {
            array: Operand::temp(0),
            pre: 1,
            post: 1,
            index: 0,
        },
        InstrKind::MasgnRest {
            array: Operand::temp(0),
            pre: 1,
            post: 0,
            index: 1,
        },
        // Variable access
        InstrKind::BindingLoad {
            scope: method,
            local: LocalVariable::new("x", 1, 0),
        },
        InstrKind::BindingStore {
            scope: method,
            local: LocalVariable::new("x", 1, 0),
            value: Operand::Fixnum(3),
        },
        InstrKind::GetField {
            source: Operand::SelfValue,
            name: "@ivar".into(),
        },
        InstrKind::PutField {
            target: Operand::SelfValue,
            name: "@ivar".into(),
            value: Operand::Nil,
        },
        InstrKind::GetCvar {
            source: Operand::temp(0),
            name: "@@count".into(),
        },
        InstrKind::PutCvar {
            target: Operand::temp(0),
            name: "@@count".into(),
            value: Operand::Fixnum(0),
        },
        InstrKind::ClassVarModule {
            starting_scope: Operand::CurrentScope { depth: 0 },
            object: Operand::SelfValue,
        },
        InstrKind::GetGlobalVar {
            name: "$0".into(),
        },
        InstrKind::PutGlobalVar {
            name: "$debug".into(),
            value: Operand::Boolean(true),
        },
        InstrKind::GvarAlias {
            new_name: Operand::string("$new"),
            old_name: Operand::string("$old"),
        },
        InstrKind::SetCapturedVar {
            match2_result: Operand::temp(0),
            var_name: "year".into(),
        },
        InstrKind::ArgScopeDepth,
        // Constants
        InstrKind::SearchConst {
            name: "Object".into(),
            starting_scope: Operand::CurrentScope { depth: 0 },
            no_private_consts: false,
        },
        InstrKind::LexicalSearchConst {
            defining_scope: Operand::CurrentScope { depth: 1 },
            name: "VERSION".into(),
        },
        InstrKind::InheritanceSearchConst {
            current_module: Operand::ScopeModule { depth: 0 },
            name: "Error".into(),
            no_private_consts: true,
        },
        InstrKind::ConstMissing {
            receiver: Operand::temp(0),
            missing_const: "Missing".into(),
        },
        InstrKind::PutConst {
            target: Operand::ScopeModule { depth: 0 },
            name: "LIMIT".into(),
            value: Operand::Fixnum(10),
        },
        // Definitions
        InstrKind::DefClass {
            body,
            container: Operand::ScopeModule { depth: 0 },
            superclass: Operand::Nil,
        },
        InstrKind::DefModule {
            body,
            container: Operand::ScopeModule { depth: 0 },
        },
        InstrKind::DefMetaClass {
            object: Operand::SelfValue,
            body,
        },
        InstrKind::DefInstMeth { method },
        InstrKind::DefClassMeth {
            container: Operand::SelfValue,
            method,
        },
        InstrKind::ProcessModuleBody {
            module_body: Operand::temp(0),
            block: Operand::Nil,
        },
        InstrKind::Alias {
            new_name: Operand::symbol("new_name"),
            old_name: Operand::symbol("old_name"),
        },
        InstrKind::UndefMethod {
            method_name: Operand::symbol("gone"),
        },
        InstrKind::RecordEndBlock {
            declaring_scope: body,
            end_block: Operand::WrappedClosure(closure),
        },
        // Frames, bindings and exception regions
        InstrKind::PushFrame,
        InstrKind::PopFrame,
        InstrKind::PushBinding,
        InstrKind::PopBinding,
        InstrKind::ExcRegionStart {
            first_rescue: lbl(7),
        },
        InstrKind::ExcRegionEnd,
        InstrKind::GetErrorInfo,
        InstrKind::RestoreErrorInfo {
            arg: Operand::temp(0),
        },
        InstrKind::LoadFrameClosure,
        InstrKind::LoadImplicitClosure,
        // Regexp matching
        InstrKind::Match {
            receiver: Operand::temp(0),
        },
        InstrKind::Match2 {
            receiver: Operand::Regexp {
                source: ByteStr::utf8("(?<year>\\d+)"),
                options: RegexpOptions::empty(),
            },
            arg: Operand::temp(1),
        },
        InstrKind::Match3 {
            receiver: Operand::temp(0),
            arg: Operand::string("text"),
        },
    ])
}

fn static_scope(variables: &[&str]) -> StaticScope {
    StaticScope::new(
        StaticScopeKind::Local,
        variables.iter().map(|v| v.to_string()).collect(),
    )
}

/// script
/// ├── Foo (class body)
/// │   └── bar (method)
/// └── _CLOSURE_1
///
/// The closure is created before the method, so arena order differs from
/// id order.
pub fn sample_tree() -> anyhow::Result<ScopeTree> {
    let mut tree = ScopeTree::new(
        Scope::new(ScopeKind::ScriptBody, "sample.rb", 0, static_scope(&["a"]))
            .with_flags(ScopeFlags::HAS_LOOPS | ScopeFlags::RECEIVES_CLOSURE_ARG)
            .with_counters(12, 8),
    );
    let root = tree.root();
    let body = tree.add_child(
        root,
        Scope::new(ScopeKind::ClassBody, "Foo", 3, static_scope(&[]))
            .with_flags(ScopeFlags::MAY_USE_REFINEMENTS),
    )?;
    let closure = tree.add_child(
        root,
        Scope::new(
            ScopeKind::Closure,
            "_CLOSURE_1",
            20,
            StaticScope::new(StaticScopeKind::Block, vec!["item".into()]).with_signature(
                Signature {
                    pre: 1,
                    ..Signature::NO_ARGUMENTS
                },
            ),
        )
        .with_flags(ScopeFlags::CAN_RECEIVE_BREAKS | ScopeFlags::ACCESSES_PARENTS_LOCAL_VARIABLES)
        .with_counters(2, 0),
    )?;
    let method = tree.add_child(
        body,
        Scope::new(
            ScopeKind::InstanceMethod,
            "bar",
            4,
            static_scope(&["x", "y", "opts", "rest", "key", "kw"])
                .with_first_keyword_index(4)
                .with_signature(Signature {
                    pre: 1,
                    opt: 1,
                    post: 0,
                    rest: Rest::Norm,
                    kwargs: 1,
                    required_kwargs: 1,
                    keyword_rest: Some(5),
                }),
        )
        .with_flags(ScopeFlags::RECEIVES_KEYWORD_ARGS | ScopeFlags::USES_ZSUPER)
        .with_counters(4, 2),
    )?;

    tree.get_mut(root)?
        .instrs_mut()?
        .extend(every_instruction(body, method, closure));
    tree.get_mut(body)?.instrs_mut()?.extend(with_result(vec![
        InstrKind::DefInstMeth { method },
        InstrKind::Return {
            value: Operand::Nil,
        },
    ]));
    tree.get_mut(method)?.instrs_mut()?.extend(with_result(vec![
        InstrKind::RecvPreReqdArg { index: 0 },
        InstrKind::Copy {
            source: Operand::Hash(vec![(Operand::symbol("k"), Operand::local("x", 0, 0))]),
        },
        InstrKind::Return {
            value: Operand::temp(1),
        },
    ]));
    tree.get_mut(closure)?.instrs_mut()?.extend(with_result(vec![
        InstrKind::LoadConst {
            value: Operand::Array(every_operand(closure)),
        },
        InstrKind::ClosureReturn {
            value: Operand::temp(0),
        },
    ]));
    Ok(tree)
}
