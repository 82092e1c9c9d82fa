//! AST -> IR lowering (§4.6).
//!
//! Re-walks the AST with its own lexical environment rather than reusing
//! `flashcpp_sem::NameEnv` - that environment's scopes are already popped
//! by the time analysis finishes (§4.5), so codegen rebuilds the same
//! nesting as it goes, consulting the already-frozen [`TypeTable`] for
//! every type it needs.

use flashcpp_par::{
    Ast, BuiltinKind, DeclId, DeclKind, ExprId, ExprKind, FunctionDecl, RecordDecl, StmtId,
    StmtKind, TypeIndex,
};
use flashcpp_sem::{ConstEvaluator, TypeKind, TypeResolver, TypeTable};
use flashcpp_util::{FxHashMap, Handler, StringHandle, StringInterner};

use crate::ir::{
    AddressStep, BinOpKind, CallTarget, CallingConvention, CastKind, CmpOp, Function,
    FunctionSignature, GlobalInit, Instruction, LValueStorage, LabelId, Operand, StackSlot, Target,
    TempVar, TranslationUnit, TypedValue, UnOpKind, ValueCategory,
};
use crate::mangle;

#[derive(Debug, Clone, Copy)]
enum VarBinding {
    Local(StackSlot, TypeIndex),
    Global(StringHandle, TypeIndex),
}

struct LoopContext {
    break_label: LabelId,
    continue_label: LabelId,
    scope_depth: usize,
}

/// Target of an assignment, computed once so the left side is only
/// evaluated once per §4.6's unified lvalue-assignment rule.
enum LValueTarget {
    Local(StackSlot, TypeIndex),
    Global(StringHandle, TypeIndex),
    Member { base: TypedValue, offset: u64, ty: TypeIndex },
    ArrayElem { array: TypedValue, index: TypedValue, elem_size: u64, ty: TypeIndex },
    Deref { pointer: TypedValue, ty: TypeIndex },
}

pub struct Builder<'a> {
    ast: &'a Ast,
    table: &'a mut TypeTable,
    interner: &'a mut StringInterner,
    handler: &'a Handler,
    target: Target,
    env: Vec<FxHashMap<StringHandle, VarBinding>>,
    scopes: Vec<StringHandle>,
    scope_locals: Vec<Vec<(StackSlot, TypeIndex)>>,
    loops: Vec<LoopContext>,
    labels_by_name: FxHashMap<StringHandle, LabelId>,
    string_pool: Vec<Vec<u8>>,
}

impl<'a> Builder<'a> {
    pub fn new(
        ast: &'a Ast,
        table: &'a mut TypeTable,
        interner: &'a mut StringInterner,
        handler: &'a Handler,
        target: Target,
    ) -> Self {
        Self {
            ast,
            table,
            interner,
            handler,
            target,
            env: vec![FxHashMap::default()],
            scopes: Vec::new(),
            scope_locals: Vec::new(),
            loops: Vec::new(),
            labels_by_name: FxHashMap::default(),
            string_pool: Vec::new(),
        }
    }

    pub fn build(mut self) -> TranslationUnit {
        let mut tu = TranslationUnit::default();
        let top_level = self.ast.top_level.clone();
        for decl in top_level {
            self.lower_top_level_decl(decl, None, &mut tu);
        }
        tu.string_pool = self.string_pool;
        tu
    }

    fn declare(&mut self, name: StringHandle, binding: VarBinding) {
        self.env.last_mut().expect("env never empty").insert(name, binding);
    }

    fn lookup(&self, name: StringHandle) -> Option<VarBinding> {
        for scope in self.env.iter().rev() {
            if let Some(b) = scope.get(&name) {
                return Some(*b);
            }
        }
        None
    }

    fn push_scope(&mut self) {
        self.env.push(FxHashMap::default());
        self.scope_locals.push(Vec::new());
    }

    fn pop_scope(&mut self, f: &mut Function) {
        self.emit_scope_destructors(f, self.scope_locals.len() - 1);
        self.env.pop();
        self.scope_locals.pop();
    }

    fn emit_scope_destructors(&mut self, f: &mut Function, scope_index: usize) {
        let locals = self.scope_locals[scope_index].clone();
        for (slot, ty) in locals.into_iter().rev() {
            self.maybe_destroy(f, slot, ty);
        }
    }

    fn maybe_destroy(&mut self, f: &mut Function, slot: StackSlot, ty: TypeIndex) {
        let TypeKind::Record(decl) = self.table.get(ty).kind.clone() else { return };
        let has_dtor = self.table.struct_info(decl).map(|s| s.has_user_destructor).unwrap_or(false);
        if !has_dtor {
            return;
        }
        let result = f.new_temp();
        f.push(Instruction::AddressOf {
            operand: TypedValue { ty, operand: Operand::Temp(self.load_local(f, slot, ty)) },
            result,
        });
        let name = crate::mangle::enclosing_path(self.interner, &self.scopes);
        let path = crate::mangle::NamePath { enclosing: name, name: crate::mangle::FunctionSpelling::Destructor };
        let mangled = crate::mangle::mangle(self.target, &path, &[], self.table, self.interner, false);
        let target = self.intern(&mangled);
        f.push(Instruction::DestructorCall {
            target,
            target_address: TypedValue::temp(ty, result),
            struct_type: ty,
        });
    }

    fn load_local(&mut self, f: &mut Function, slot: StackSlot, ty: TypeIndex) -> TempVar {
        let result = f.new_temp();
        f.push(Instruction::Load { slot, ty, result });
        f.set_category(result, ValueCategory::LValue(LValueStorage::Direct { stack_slot: slot }));
        result
    }

    fn intern(&mut self, s: &str) -> StringHandle {
        self.interner.intern(s)
    }

    fn unwind_for_return(&mut self, f: &mut Function) {
        for i in (0..self.scope_locals.len()).rev() {
            self.emit_scope_destructors(f, i);
        }
    }

    fn unwind_for_break_or_continue(&mut self, f: &mut Function, loop_scope_depth: usize) {
        for i in (loop_scope_depth..self.scope_locals.len()).rev() {
            self.emit_scope_destructors(f, i);
        }
    }

    // ---- top-level declarations ----

    fn lower_top_level_decl(&mut self, decl: DeclId, this_class: Option<(DeclId, TypeIndex)>, tu: &mut TranslationUnit) {
        let kind = self.ast.decls[decl].kind.clone();
        match kind {
            DeclKind::Namespace(ns) => {
                if let Some(name) = ns.name {
                    self.scopes.push(name);
                }
                for member in ns.members.clone() {
                    self.lower_top_level_decl(member, None, tu);
                }
                if ns.name.is_some() {
                    self.scopes.pop();
                }
            }
            DeclKind::Record(rec) => self.lower_record(decl, &rec, tu),
            DeclKind::Function(func) => {
                if let Some(function) = self.lower_function(decl, &func, this_class) {
                    let name = self.function_mangled_name(&func, this_class);
                    tu.functions.push((name, function));
                }
            }
            DeclKind::Variable(var) => {
                let ty = TypeResolver::new(self.table).resolve_type_spec(self.ast, &flashcpp_sem::NameEnv::new(), var.ty);
                let ty = self.table.type_of_decl(decl).unwrap_or(ty);
                let init = self.const_global_init(var.init, ty);
                let element_count = match &self.table.get(ty).kind {
                    TypeKind::Array { size, .. } => *size,
                    _ => None,
                };
                self.declare(var.name, VarBinding::Global(var.name, ty));
                tu.globals.push(Instruction::GlobalVariableDecl { name: var.name, ty, init, element_count });
            }
            _ => {}
        }
    }

    fn const_global_init(&mut self, init: Option<ExprId>, ty: TypeIndex) -> GlobalInit {
        let Some(expr) = init else { return GlobalInit::Zero };
        let env = flashcpp_sem::NameEnv::new();
        let mut evaluator = ConstEvaluator::new(self.ast, self.table, self.interner);
        match evaluator.eval(&env, expr) {
            Ok(v) => match v.as_i64() {
                Some(n) => {
                    let size = self.table.size_of(ty).max(1) as usize;
                    GlobalInit::Bytes(n.to_le_bytes()[..size.min(8)].to_vec())
                }
                None => GlobalInit::Zero,
            },
            Err(_) => GlobalInit::Zero,
        }
    }

    fn lower_record(&mut self, decl: DeclId, rec: &RecordDecl, tu: &mut TranslationUnit) {
        self.scopes.push(rec.name);
        let record_ty = self.table.type_of_decl(decl).unwrap_or_else(|| self.table.error_type());
        for member in rec.members.clone() {
            let member_kind = self.ast.decls[member].kind.clone();
            match member_kind {
                DeclKind::Function(func) => {
                    if let Some(function) = self.lower_function(member, &func, Some((decl, record_ty))) {
                        let name = self.function_mangled_name(&func, Some((decl, record_ty)));
                        tu.functions.push((name, function));
                    }
                }
                DeclKind::Record(nested) => self.lower_record(member, &nested, tu),
                _ => {}
            }
        }
        self.scopes.pop();
    }

    fn function_mangled_name(&mut self, func: &FunctionDecl, this_class: Option<(DeclId, TypeIndex)>) -> StringHandle {
        let spelling = mangle::function_spelling(self.interner, &func.name);
        let path = mangle::NamePath {
            enclosing: self.scopes.iter().map(|s| self.interner.resolve(*s)).collect(),
            name: spelling,
        };
        // `this` is implicit and does not participate in Itanium/MSVC
        // parameter mangling, so it is never added to `param_types`.
        let _ = this_class;
        let param_types: Vec<TypeIndex> = func
            .params
            .iter()
            .map(|p| TypeResolver::new(self.table).resolve_type_spec(self.ast, &flashcpp_sem::NameEnv::new(), p.ty))
            .collect();
        let mangled = mangle::mangle(self.target, &path, &param_types, self.table, self.interner, false);
        self.intern(&mangled)
    }

    // ---- functions ----

    fn lower_function(
        &mut self,
        _decl: DeclId,
        func: &FunctionDecl,
        this_class: Option<(DeclId, TypeIndex)>,
    ) -> Option<Function> {
        let Some(body) = func.body else { return None };

        let mut f = Function::default();
        self.push_scope();

        let return_ty = func
            .ret_type
            .map(|rt| TypeResolver::new(self.table).resolve_type_spec(self.ast, &flashcpp_sem::NameEnv::new(), rt))
            .unwrap_or_else(|| self.table.void());
        let has_hidden_return_param = self.table.is_class(return_ty);

        let mut param_types = Vec::new();
        let mut param_slots = Vec::new();

        if has_hidden_return_param {
            let slot_ty = self.table.pointer_to(return_ty, Default::default());
            let slot = f.new_slot(slot_ty);
            f.push(Instruction::StackAlloc { slot, ty: slot_ty });
            param_slots.push(slot);
            param_types.push(slot_ty);
        }

        if let Some((_, class_ty)) = this_class {
            let this_ty = self.table.pointer_to(class_ty, Default::default());
            let slot = f.new_slot(this_ty);
            f.push(Instruction::StackAlloc { slot, ty: this_ty });
            param_slots.push(slot);
            let this_name = self.intern("this");
            self.declare(this_name, VarBinding::Local(slot, this_ty));
        }

        for param in &func.params {
            let env_stub = flashcpp_sem::NameEnv::new();
            let ty = TypeResolver::new(self.table).resolve_type_spec(self.ast, &env_stub, param.ty);
            let slot = f.new_slot(ty);
            f.push(Instruction::StackAlloc { slot, ty });
            param_slots.push(slot);
            param_types.push(ty);
            if let Some(name) = param.name {
                self.declare(name, VarBinding::Local(slot, ty));
            }
        }

        f.param_slots = param_slots;

        let mangled = self.function_mangled_name(func, this_class);
        f.push(Instruction::FunctionDecl(FunctionSignature {
            mangled_name: mangled,
            return_type: return_ty,
            params: param_types,
            has_hidden_return_param,
            calling_convention: CallingConvention::Native,
            is_external: false,
        }));

        self.lower_stmt(&mut f, body);

        // Fall-through path out of the function body: unwind and return.
        self.unwind_for_return(&mut f);
        f.push(Instruction::Return(None));
        f.push(Instruction::FunctionEnd);

        self.pop_scope(&mut f);
        Some(f)
    }

    // ---- statements ----

    fn lower_stmt(&mut self, f: &mut Function, stmt: StmtId) {
        let kind = self.ast.stmts[stmt].kind.clone();
        match kind {
            StmtKind::Block(stmts) => {
                self.push_scope();
                for s in stmts {
                    self.lower_stmt(f, s);
                }
                self.pop_scope(f);
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                let then_label = f.new_label();
                let else_label = f.new_label();
                let end_label = f.new_label();
                let cond_val = self.lower_expr(f, cond);
                f.push(Instruction::CondBranch { cond: cond_val, then_label, else_label });
                f.push(Instruction::Label(then_label));
                self.lower_stmt(f, then_branch);
                f.push(Instruction::Jump(end_label));
                f.push(Instruction::Label(else_label));
                if let Some(e) = else_branch {
                    self.lower_stmt(f, e);
                }
                f.push(Instruction::Jump(end_label));
                f.push(Instruction::Label(end_label));
            }
            StmtKind::Switch { cond, body, cases } => {
                // Case labels land at the statement index the parser
                // recorded into the switch body's own flattened block, so
                // fall-through between cases is just falling through the
                // block's statement list (§4.6 matches C++ switch
                // semantics, not a per-case jump table).
                let cond_val = self.lower_expr(f, cond);
                let end_label = f.new_label();
                let mut case_labels = Vec::new();
                let mut default_label = None;
                for case in &cases {
                    let label = f.new_label();
                    case_labels.push((case.clone(), label));
                    if case.value.is_none() {
                        default_label = Some(label);
                    }
                }
                let bool_ty = self.table.builtin(BuiltinKind::Bool);
                for (case, label) in &case_labels {
                    if let Some(value_expr) = case.value {
                        let value_val = self.lower_expr(f, value_expr);
                        let cmp = f.new_temp();
                        f.push(Instruction::Compare { op: CmpOp::Eq, lhs: cond_val.clone(), rhs: value_val, result: cmp });
                        let next = f.new_label();
                        f.push(Instruction::CondBranch {
                            cond: TypedValue::temp(bool_ty, cmp),
                            then_label: *label,
                            else_label: next,
                        });
                        f.push(Instruction::Label(next));
                    }
                }
                f.push(Instruction::Jump(default_label.unwrap_or(end_label)));

                self.loops.push(LoopContext { break_label: end_label, continue_label: end_label, scope_depth: self.scope_locals.len() });
                let body_stmts = match self.ast.stmts[body].kind.clone() {
                    StmtKind::Block(stmts) => stmts,
                    _ => vec![body],
                };
                self.push_scope();
                for (index, stmt) in body_stmts.into_iter().enumerate() {
                    for (case, label) in &case_labels {
                        if case.stmt_index == index {
                            f.push(Instruction::Label(*label));
                        }
                    }
                    self.lower_stmt(f, stmt);
                }
                self.pop_scope(f);
                self.loops.pop();
                f.push(Instruction::Label(end_label));
            }
            StmtKind::For { init, cond, step, body } => {
                self.push_scope();
                if let Some(init) = init {
                    self.lower_stmt(f, init);
                }
                let cond_label = f.new_label();
                let body_label = f.new_label();
                let step_label = f.new_label();
                let end_label = f.new_label();
                f.push(Instruction::Jump(cond_label));
                f.push(Instruction::Label(cond_label));
                if let Some(cond) = cond {
                    let cond_val = self.lower_expr(f, cond);
                    f.push(Instruction::CondBranch { cond: cond_val, then_label: body_label, else_label: end_label });
                } else {
                    f.push(Instruction::Jump(body_label));
                }
                f.push(Instruction::Label(body_label));
                self.loops.push(LoopContext { break_label: end_label, continue_label: step_label, scope_depth: self.scope_locals.len() });
                self.lower_stmt(f, body);
                self.loops.pop();
                f.push(Instruction::Label(step_label));
                if let Some(step) = step {
                    self.lower_expr(f, step);
                }
                f.push(Instruction::Jump(cond_label));
                f.push(Instruction::Label(end_label));
                self.pop_scope(f);
            }
            StmtKind::RangeFor { decl, range, body } => {
                self.push_scope();
                let DeclKind::Variable(var) = self.ast.decls[decl].kind.clone() else { unreachable!() };
                let range_ty = self.infer_expr_ty(range);
                let elem_ty = match &self.table.get(range_ty).kind {
                    TypeKind::Array { element, .. } => *element,
                    TypeKind::Pointer(pointee) => *pointee,
                    _ => self.table.error_type(),
                };
                let var_slot = f.new_slot(elem_ty);
                f.push(Instruction::StackAlloc { slot: var_slot, ty: elem_ty });
                self.declare(var.name, VarBinding::Local(var_slot, elem_ty));

                let idx_ty = self.table.builtin(BuiltinKind::UnsignedLong);
                let idx_slot = f.new_slot(idx_ty);
                f.push(Instruction::StackAlloc { slot: idx_slot, ty: idx_ty });
                f.push(Instruction::Store { slot: idx_slot, value: TypedValue::int_const(idx_ty, 0) });

                let range_val = self.lower_expr(f, range);
                let count = match &self.table.get(range_ty).kind {
                    TypeKind::Array { size: Some(n), .. } => *n as i64,
                    _ => 0,
                };
                let elem_size = self.table.size_of(elem_ty);

                let cond_label = f.new_label();
                let body_label = f.new_label();
                let step_label = f.new_label();
                let end_label = f.new_label();
                f.push(Instruction::Jump(cond_label));
                f.push(Instruction::Label(cond_label));
                let idx_val = self.load_local(f, idx_slot, idx_ty);
                let cmp = f.new_temp();
                f.push(Instruction::Compare {
                    op: CmpOp::Lt,
                    lhs: TypedValue::temp(idx_ty, idx_val),
                    rhs: TypedValue::int_const(idx_ty, count),
                    result: cmp,
                });
                let bool_ty = self.table.builtin(BuiltinKind::Bool);
                f.push(Instruction::CondBranch { cond: TypedValue::temp(bool_ty, cmp), then_label: body_label, else_label: end_label });
                f.push(Instruction::Label(body_label));
                let idx_val2 = self.load_local(f, idx_slot, idx_ty);
                let elem = f.new_temp();
                f.push(Instruction::ArrayLoad {
                    array: range_val.clone(),
                    index: TypedValue::temp(idx_ty, idx_val2),
                    elem_size,
                    elem_type: elem_ty,
                    result: elem,
                });
                f.push(Instruction::Store { slot: var_slot, value: TypedValue::temp(elem_ty, elem) });

                self.loops.push(LoopContext { break_label: end_label, continue_label: step_label, scope_depth: self.scope_locals.len() });
                self.lower_stmt(f, body);
                self.loops.pop();

                f.push(Instruction::Label(step_label));
                let idx_val3 = self.load_local(f, idx_slot, idx_ty);
                let next = f.new_temp();
                f.push(Instruction::BinaryOp {
                    op: BinOpKind::Add,
                    lhs: TypedValue::temp(idx_ty, idx_val3),
                    rhs: TypedValue::int_const(idx_ty, 1),
                    result: next,
                });
                f.push(Instruction::Store { slot: idx_slot, value: TypedValue::temp(idx_ty, next) });
                f.push(Instruction::Jump(cond_label));
                f.push(Instruction::Label(end_label));
                self.pop_scope(f);
            }
            StmtKind::While { cond, body } => {
                let cond_label = f.new_label();
                let body_label = f.new_label();
                let end_label = f.new_label();
                f.push(Instruction::Jump(cond_label));
                f.push(Instruction::Label(cond_label));
                let cond_val = self.lower_expr(f, cond);
                f.push(Instruction::CondBranch { cond: cond_val, then_label: body_label, else_label: end_label });
                f.push(Instruction::Label(body_label));
                self.loops.push(LoopContext { break_label: end_label, continue_label: cond_label, scope_depth: self.scope_locals.len() });
                self.lower_stmt(f, body);
                self.loops.pop();
                f.push(Instruction::Jump(cond_label));
                f.push(Instruction::Label(end_label));
            }
            StmtKind::DoWhile { body, cond } => {
                let body_label = f.new_label();
                let cond_label = f.new_label();
                let end_label = f.new_label();
                f.push(Instruction::Label(body_label));
                self.loops.push(LoopContext { break_label: end_label, continue_label: cond_label, scope_depth: self.scope_locals.len() });
                self.lower_stmt(f, body);
                self.loops.pop();
                f.push(Instruction::Label(cond_label));
                let cond_val = self.lower_expr(f, cond);
                f.push(Instruction::CondBranch { cond: cond_val, then_label: body_label, else_label: end_label });
                f.push(Instruction::Label(end_label));
            }
            StmtKind::Return(value) => {
                let lowered = value.map(|v| self.lower_expr(f, v));
                self.unwind_for_return(f);
                f.push(Instruction::Return(lowered));
            }
            StmtKind::Break => {
                if let Some(ctx) = self.loops.last() {
                    let (label, depth) = (ctx.break_label, ctx.scope_depth);
                    self.unwind_for_break_or_continue(f, depth);
                    f.push(Instruction::Jump(label));
                }
            }
            StmtKind::Continue => {
                if let Some(ctx) = self.loops.last() {
                    let (label, depth) = (ctx.continue_label, ctx.scope_depth);
                    self.unwind_for_break_or_continue(f, depth);
                    f.push(Instruction::Jump(label));
                }
            }
            StmtKind::Goto(name) => {
                let label = *self.labels_by_name.entry(name).or_insert_with(|| f.new_label());
                f.push(Instruction::Jump(label));
            }
            StmtKind::Label { name, stmt } => {
                let label = *self.labels_by_name.entry(name).or_insert_with(|| f.new_label());
                f.push(Instruction::Label(label));
                self.lower_stmt(f, stmt);
            }
            StmtKind::TryCatch { try_block, catches } => {
                let end_label = f.new_label();
                f.push(Instruction::TryBegin);
                self.lower_stmt(f, try_block);
                f.push(Instruction::TryEnd);
                f.push(Instruction::Jump(end_label));
                for catch in catches {
                    self.push_scope();
                    let catch_ty = catch
                        .param
                        .as_ref()
                        .map(|p| TypeResolver::new(self.table).resolve_type_spec(self.ast, &flashcpp_sem::NameEnv::new(), p.ty))
                        .unwrap_or_else(|| self.table.void());
                    let continuation = f.new_label();
                    f.push(Instruction::CatchBegin { catch_type: catch_ty, continuation_label: continuation });
                    if let Some(param) = &catch.param {
                        if let Some(name) = param.name {
                            let slot = f.new_slot(catch_ty);
                            f.push(Instruction::StackAlloc { slot, ty: catch_ty });
                            self.declare(name, VarBinding::Local(slot, catch_ty));
                        }
                    }
                    self.lower_stmt(f, catch.body);
                    f.push(Instruction::CatchEnd { continuation_label: continuation });
                    self.pop_scope(f);
                }
                f.push(Instruction::Label(end_label));
            }
            StmtKind::ExpressionStmt(expr) => {
                self.lower_expr(f, expr);
            }
            StmtKind::Declaration(decl) => self.lower_local_decl(f, decl),
            StmtKind::Empty => {}
        }
    }

    fn lower_local_decl(&mut self, f: &mut Function, decl: DeclId) {
        let kind = self.ast.decls[decl].kind.clone();
        let DeclKind::Variable(var) = kind else { return };
        let ty = self.table.type_of_decl(decl).unwrap_or_else(|| self.table.error_type());
        let slot = f.new_slot(ty);
        f.push(Instruction::StackAlloc { slot, ty });
        self.declare(var.name, VarBinding::Local(slot, ty));
        if self.table.is_class(ty) {
            self.scope_locals.last_mut().expect("scope active").push((slot, ty));
        }
        if let Some(init) = var.init {
            if self.table.is_class(ty) {
                let args = match &self.ast.exprs[init].kind {
                    ExprKind::Constructor { args, .. } => args.clone(),
                    _ => vec![init],
                };
                let lowered_args: Vec<TypedValue> = args.iter().map(|a| self.lower_expr(f, *a)).collect();
                let mangled = self.ast_constructor_name(ty);
                f.push(Instruction::ConstructorCall {
                    target: mangled,
                    args: lowered_args,
                    use_return_slot: false,
                    return_slot_offset: 0,
                });
            } else {
                let value = self.lower_expr(f, init);
                f.push(Instruction::Store { slot, value });
            }
        }
    }

    fn ast_constructor_name(&mut self, ty: TypeIndex) -> StringHandle {
        let TypeKind::Record(decl) = self.table.get(ty).kind.clone() else {
            return self.intern("<ctor>");
        };
        let name = self
            .table
            .struct_info(decl)
            .map(|s| self.interner.resolve(s.name).to_owned())
            .unwrap_or_else(|| "anon".into());
        self.intern(&format!("{}::{{ctor}}", name))
    }

    fn infer_expr_ty(&mut self, expr: ExprId) -> TypeIndex {
        let env = flashcpp_sem::NameEnv::new();
        let mut visited = Default::default();
        // Re-declares nothing useful here: identifiers resolve through
        // `self.env`, not this throwaway `NameEnv`, so type inference of a
        // bare identifier falls back to `decl_value_type`'s lookup only for
        // names this function didn't already bind (globals, free
        // functions). Locals are resolved directly by `lower_expr` instead.
        if let ExprKind::IdentifierRef(name) = &self.ast.exprs[expr].kind {
            if let Some(binding) = self.lookup(*name) {
                return match binding {
                    VarBinding::Local(_, ty) | VarBinding::Global(_, ty) => ty,
                };
            }
        }
        TypeResolver::new(self.table).infer_expr_type(self.ast, &env, expr, &mut visited, 0)
    }

    // ---- expressions ----

    fn lower_expr(&mut self, f: &mut Function, expr: ExprId) -> TypedValue {
        let ty = self.infer_expr_ty(expr);
        let kind = self.ast.exprs[expr].kind.clone();
        match kind {
            ExprKind::NumericLiteral(lit) => {
                let text = self.interner.resolve(lit.text);
                match lit.value {
                    flashcpp_lex::NumericValue::Int(v) => TypedValue::int_const(ty, v as i64),
                    flashcpp_lex::NumericValue::Float(v) => TypedValue { ty, operand: Operand::FloatConst(v) },
                    flashcpp_lex::NumericValue::Deferred if lit.is_float => {
                        TypedValue { ty, operand: Operand::FloatConst(text.parse().unwrap_or(0.0)) }
                    }
                    flashcpp_lex::NumericValue::Deferred => TypedValue::int_const(ty, text.parse().unwrap_or(0)),
                }
            }
            ExprKind::BoolLiteral(b) => TypedValue::int_const(ty, b as i64),
            ExprKind::CharLiteral(c) => TypedValue::int_const(ty, c.value as i64),
            ExprKind::NullptrLiteral => TypedValue { ty, operand: Operand::Null },
            ExprKind::StringLiteral(lit) => {
                let idx = self.string_pool.len() as u32;
                self.string_pool.push(lit.bytes.clone());
                TypedValue { ty, operand: Operand::StringConst(idx) }
            }
            ExprKind::IdentifierRef(name) => self.load_named(f, name, ty),
            ExprKind::QualifiedId(qid) => {
                let name = qid.segments.last().map(|s| s.name).unwrap_or_else(|| name_placeholder(self));
                self.load_named(f, name, ty)
            }
            ExprKind::BinaryOp { op, lhs, rhs } => self.lower_binary(f, op, lhs, rhs, ty),
            ExprKind::UnaryOp { op, operand, is_postfix } => self.lower_unary(f, op, operand, is_postfix, ty),
            ExprKind::MemberAccess { base, member, is_arrow } => {
                let target = self.lower_member_target(f, base, member, is_arrow);
                self.load_lvalue(f, target)
            }
            ExprKind::ArraySubscript { base, index } => {
                let target = self.lower_array_target(f, base, index);
                self.load_lvalue(f, target)
            }
            ExprKind::Call { callee, args } => self.lower_call(f, callee, args, ty),
            ExprKind::Constructor { args, .. } => {
                let lowered: Vec<TypedValue> = args.iter().map(|a| self.lower_expr(f, *a)).collect();
                let mangled = self.ast_constructor_name(ty);
                let result = f.new_temp();
                f.push(Instruction::ConstructorCall { target: mangled, args: lowered, use_return_slot: false, return_slot_offset: 0 });
                TypedValue::temp(ty, result)
            }
            ExprKind::Cast { kind: cast_kind, operand, .. } => {
                let operand_val = self.lower_expr(f, operand);
                let result = f.new_temp();
                f.push(Instruction::Cast { kind: classify_cast(self.table, operand_val.ty, ty, cast_kind), operand: operand_val, result });
                TypedValue::temp(ty, result)
            }
            ExprKind::Sizeof(operand) => {
                let size = match operand {
                    flashcpp_par::SizeofOperand::Type(spec) => {
                        let resolved = TypeResolver::new(self.table).resolve_type_spec(self.ast, &flashcpp_sem::NameEnv::new(), spec);
                        self.table.size_of(resolved)
                    }
                    flashcpp_par::SizeofOperand::Expr(e) => {
                        let t = self.infer_expr_ty(e);
                        self.table.size_of(t)
                    }
                };
                TypedValue::int_const(ty, size as i64)
            }
            ExprKind::Alignof(spec) => {
                let resolved = TypeResolver::new(self.table).resolve_type_spec(self.ast, &flashcpp_sem::NameEnv::new(), spec);
                TypedValue::int_const(ty, self.table.align_of(resolved) as i64)
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                let then_label = f.new_label();
                let else_label = f.new_label();
                let end_label = f.new_label();
                let result_slot = f.new_slot(ty);
                f.push(Instruction::StackAlloc { slot: result_slot, ty });
                let cond_val = self.lower_expr(f, cond);
                f.push(Instruction::CondBranch { cond: cond_val, then_label, else_label });
                f.push(Instruction::Label(then_label));
                let then_val = self.lower_expr(f, then_expr);
                f.push(Instruction::Store { slot: result_slot, value: then_val });
                f.push(Instruction::Jump(end_label));
                f.push(Instruction::Label(else_label));
                let else_val = self.lower_expr(f, else_expr);
                f.push(Instruction::Store { slot: result_slot, value: else_val });
                f.push(Instruction::Jump(end_label));
                f.push(Instruction::Label(end_label));
                let result = self.load_local(f, result_slot, ty);
                TypedValue::temp(ty, result)
            }
            ExprKind::Assign { op, place, value } => self.lower_assign(f, op, place, value, ty),
            ExprKind::Comma(exprs) => {
                let mut last = TypedValue { ty, operand: Operand::Null };
                for (i, e) in exprs.iter().enumerate() {
                    let v = self.lower_expr(f, *e);
                    if i == exprs.len() - 1 {
                        last = v;
                    }
                }
                last
            }
            ExprKind::New(new_expr) => {
                let pointee = TypeResolver::new(self.table).resolve_type_spec(self.ast, &flashcpp_sem::NameEnv::new(), new_expr.type_spec);
                let size = self.table.size_of(pointee);
                let result = f.new_temp();
                f.push(Instruction::Call {
                    callee: CallTarget::Direct(self.intern("operator_new")),
                    args: vec![TypedValue::int_const(self.table.builtin(BuiltinKind::UnsignedLong), size as i64)],
                    result: Some(result),
                    uses_return_slot: false,
                    return_slot: None,
                });
                TypedValue::temp(ty, result)
            }
            ExprKind::Delete { operand, .. } => {
                let operand_val = self.lower_expr(f, operand);
                f.push(Instruction::Call {
                    callee: CallTarget::Direct(self.intern("operator_delete")),
                    args: vec![operand_val],
                    result: None,
                    uses_return_slot: false,
                    return_slot: None,
                });
                TypedValue { ty: self.table.void(), operand: Operand::Null }
            }
            ExprKind::Throw(operand) => {
                let lowered = operand.map(|e| self.lower_expr(f, e));
                let desc_ty = lowered.as_ref().map(|v| v.ty).unwrap_or_else(|| self.table.void());
                f.push(Instruction::Throw { type_descriptor: desc_ty, operand: lowered });
                TypedValue { ty: self.table.void(), operand: Operand::Null }
            }
            ExprKind::TypeTraitIntrinsic { .. } | ExprKind::FoldExpression { .. } | ExprKind::Lambda(_) | ExprKind::PointerToMember { .. } | ExprKind::SizeofPack(_) => {
                TypedValue { ty, operand: Operand::Null }
            }
        }
    }

    fn load_named(&mut self, f: &mut Function, name: StringHandle, ty: TypeIndex) -> TypedValue {
        match self.lookup(name) {
            Some(VarBinding::Local(slot, var_ty)) => {
                let result = self.load_local(f, slot, var_ty);
                TypedValue::temp(var_ty, result)
            }
            Some(VarBinding::Global(gname, var_ty)) => {
                let result = f.new_temp();
                f.push(Instruction::GlobalLoad { name: gname, ty: var_ty, result });
                TypedValue::temp(var_ty, result)
            }
            None => TypedValue { ty, operand: Operand::Null },
        }
    }

    fn lower_member_target(&mut self, f: &mut Function, base: ExprId, member: StringHandle, is_arrow: bool) -> LValueTarget {
        let base_val = self.lower_expr_as_base(f, base, is_arrow);
        let base_ty = self.table.strip_references(base_val.ty);
        let record_ty = if is_arrow {
            match &self.table.get(base_ty).kind {
                TypeKind::Pointer(pointee) => *pointee,
                _ => base_ty,
            }
        } else {
            base_ty
        };
        let (offset, member_ty) = match &self.table.get(record_ty).kind {
            TypeKind::Record(decl) => self
                .table
                .struct_info(*decl)
                .and_then(|info| info.members.get(&member))
                .map(|m| (m.offset, m.ty))
                .unwrap_or((0, self.table.error_type())),
            _ => (0, self.table.error_type()),
        };
        LValueTarget::Member { base: base_val, offset, ty: member_ty }
    }

    /// Evaluates `base` as the address a member/array access chains off
    /// of: for `.` access the base must itself be an address (so a direct
    /// local gets `AddressOf`'d), for `->` it's already a pointer value.
    fn lower_expr_as_base(&mut self, f: &mut Function, base: ExprId, is_arrow: bool) -> TypedValue {
        if is_arrow {
            return self.lower_expr(f, base);
        }
        if let ExprKind::IdentifierRef(name) = &self.ast.exprs[base].kind {
            if let Some(VarBinding::Local(slot, var_ty)) = self.lookup(*name) {
                let loaded = self.load_local(f, slot, var_ty);
                let ptr_ty = self.table.pointer_to(var_ty, Default::default());
                let result = f.new_temp();
                f.push(Instruction::AddressOf { operand: TypedValue::temp(var_ty, loaded), result });
                return TypedValue::temp(ptr_ty, result);
            }
        }
        // Nested member access (`a.b.c`): recurse as an address chain.
        if let ExprKind::MemberAccess { base: inner_base, member, is_arrow: inner_arrow } = self.ast.exprs[base].kind.clone() {
            let target = self.lower_member_target(f, inner_base, member, inner_arrow);
            return self.address_of_lvalue(f, target);
        }
        let val = self.lower_expr(f, base);
        let ptr_ty = self.table.pointer_to(val.ty, Default::default());
        let result = f.new_temp();
        f.push(Instruction::AddressOf { operand: val, result });
        TypedValue::temp(ptr_ty, result)
    }

    fn address_of_lvalue(&mut self, f: &mut Function, target: LValueTarget) -> TypedValue {
        match target {
            LValueTarget::Local(slot, ty) => {
                let loaded = self.load_local(f, slot, ty);
                let ptr_ty = self.table.pointer_to(ty, Default::default());
                let result = f.new_temp();
                f.push(Instruction::AddressOf { operand: TypedValue::temp(ty, loaded), result });
                TypedValue::temp(ptr_ty, result)
            }
            LValueTarget::Global(name, ty) => {
                let loaded = f.new_temp();
                f.push(Instruction::GlobalLoad { name, ty, result: loaded });
                let ptr_ty = self.table.pointer_to(ty, Default::default());
                let result = f.new_temp();
                f.push(Instruction::AddressOf { operand: TypedValue::temp(ty, loaded), result });
                TypedValue::temp(ptr_ty, result)
            }
            LValueTarget::Member { base, offset, ty } => {
                let result = f.new_temp();
                f.push(Instruction::ComputeAddress { base, chain: vec![AddressStep::MemberOffset { offset }], result });
                let ptr_ty = self.table.pointer_to(ty, Default::default());
                TypedValue::temp(ptr_ty, result)
            }
            LValueTarget::ArrayElem { array, index, elem_size, ty } => {
                let result = f.new_temp();
                f.push(Instruction::ComputeAddress { base: array, chain: vec![AddressStep::ArrayIndex { index, elem_size }], result });
                let ptr_ty = self.table.pointer_to(ty, Default::default());
                TypedValue::temp(ptr_ty, result)
            }
            LValueTarget::Deref { pointer, .. } => pointer,
        }
    }

    fn lower_array_target(&mut self, f: &mut Function, base: ExprId, index: ExprId) -> LValueTarget {
        let base_ty = self.infer_expr_ty(base);
        let elem_ty = match &self.table.get(base_ty).kind {
            TypeKind::Array { element, .. } | TypeKind::Pointer(element) => *element,
            _ => self.table.error_type(),
        };
        let elem_size = self.table.size_of(elem_ty);
        let base_val = self.lower_expr(f, base);
        let index_val = self.lower_expr(f, index);
        LValueTarget::ArrayElem { array: base_val, index: index_val, elem_size, ty: elem_ty }
    }

    fn load_lvalue(&mut self, f: &mut Function, target: LValueTarget) -> TypedValue {
        match target {
            LValueTarget::Local(slot, ty) => {
                let result = self.load_local(f, slot, ty);
                TypedValue::temp(ty, result)
            }
            LValueTarget::Global(name, ty) => {
                let result = f.new_temp();
                f.push(Instruction::GlobalLoad { name, ty, result });
                TypedValue::temp(ty, result)
            }
            LValueTarget::Member { base, offset, ty } => {
                let result = f.new_temp();
                if let Some(base_temp) = temp_of(&base) {
                    let name = self.intern("<member>");
                    f.set_category(result, ValueCategory::LValue(LValueStorage::Member { base: base_temp, offset, name }));
                }
                f.push(Instruction::MemberLoad { base, offset, member_type: ty, result });
                TypedValue::temp(ty, result)
            }
            LValueTarget::ArrayElem { array, index, elem_size, ty } => {
                let result = f.new_temp();
                if let (Some(array_temp), Some(index_temp)) = (temp_of(&array), temp_of(&index)) {
                    f.set_category(result, ValueCategory::LValue(LValueStorage::ArrayElement { array: array_temp, index: index_temp, elem_type: ty }));
                }
                f.push(Instruction::ArrayLoad { array, index, elem_size, elem_type: ty, result });
                TypedValue::temp(ty, result)
            }
            LValueTarget::Deref { pointer, ty } => {
                let result = f.new_temp();
                if let Some(ptr_temp) = temp_of(&pointer) {
                    f.set_category(result, ValueCategory::LValue(LValueStorage::Indirect { pointer: ptr_temp }));
                }
                f.push(Instruction::Dereference { pointer, result });
                TypedValue::temp(ty, result)
            }
        }
    }

    fn store_lvalue(&mut self, f: &mut Function, target: LValueTarget, value: TypedValue) {
        match target {
            LValueTarget::Local(slot, _) => f.push(Instruction::Store { slot, value }),
            LValueTarget::Global(name, _) => f.push(Instruction::GlobalStore { name, value }),
            LValueTarget::Member { base, offset, ty } => f.push(Instruction::MemberStore { base, offset, member_type: ty, value }),
            LValueTarget::ArrayElem { array, index, elem_size, ty } => {
                f.push(Instruction::ArrayStore { array, index, elem_size, elem_type: ty, value })
            }
            LValueTarget::Deref { pointer, ty } => {
                f.push(Instruction::MemberStore { base: pointer, offset: 0, member_type: ty, value })
            }
        }
    }

    /// Evaluates the left side of an assignment to a target location
    /// without loading through it (§4.6's "evaluate LHS in LValueAddress
    /// context" step).
    fn lower_place(&mut self, f: &mut Function, expr: ExprId) -> LValueTarget {
        match self.ast.exprs[expr].kind.clone() {
            ExprKind::IdentifierRef(name) => match self.lookup(name) {
                Some(VarBinding::Local(slot, ty)) => LValueTarget::Local(slot, ty),
                Some(VarBinding::Global(gname, ty)) => LValueTarget::Global(gname, ty),
                None => {
                    let ty = self.table.error_type();
                    LValueTarget::Local(f.new_slot(ty), ty)
                }
            },
            ExprKind::MemberAccess { base, member, is_arrow } => self.lower_member_target(f, base, member, is_arrow),
            ExprKind::ArraySubscript { base, index } => self.lower_array_target(f, base, index),
            ExprKind::UnaryOp { op: flashcpp_lex::OperatorKind::Star, operand, .. } => {
                let ptr = self.lower_expr(f, operand);
                let ty = match &self.table.get(ptr.ty).kind {
                    TypeKind::Pointer(pointee) => *pointee,
                    _ => self.table.error_type(),
                };
                LValueTarget::Deref { pointer: ptr, ty }
            }
            _ => {
                let ty = self.infer_expr_ty(expr);
                LValueTarget::Local(f.new_slot(ty), ty)
            }
        }
    }

    fn lower_assign(&mut self, f: &mut Function, op: flashcpp_lex::OperatorKind, place: ExprId, value: ExprId, ty: TypeIndex) -> TypedValue {
        let target = self.lower_place(f, place);
        let rhs = self.lower_expr(f, value);
        let final_value = if op == flashcpp_lex::OperatorKind::Assign {
            rhs
        } else {
            let current = self.load_lvalue_ref(f, &target);
            let bin_op = compound_to_binop(op);
            let result = f.new_temp();
            f.push(Instruction::BinaryOp { op: bin_op, lhs: current, rhs, result });
            TypedValue::temp(ty, result)
        };
        self.store_lvalue(f, target, final_value.clone());
        final_value
    }

    fn load_lvalue_ref(&mut self, f: &mut Function, target: &LValueTarget) -> TypedValue {
        match target {
            LValueTarget::Local(slot, ty) => TypedValue::temp(*ty, self.load_local(f, *slot, *ty)),
            LValueTarget::Global(name, ty) => {
                let result = f.new_temp();
                f.push(Instruction::GlobalLoad { name: *name, ty: *ty, result });
                TypedValue::temp(*ty, result)
            }
            LValueTarget::Member { base, offset, ty } => {
                let result = f.new_temp();
                f.push(Instruction::MemberLoad { base: base.clone(), offset: *offset, member_type: *ty, result });
                TypedValue::temp(*ty, result)
            }
            LValueTarget::ArrayElem { array, index, elem_size, ty } => {
                let result = f.new_temp();
                f.push(Instruction::ArrayLoad { array: array.clone(), index: index.clone(), elem_size: *elem_size, elem_type: *ty, result });
                TypedValue::temp(*ty, result)
            }
            LValueTarget::Deref { pointer, ty } => {
                let result = f.new_temp();
                f.push(Instruction::Dereference { pointer: pointer.clone(), result });
                TypedValue::temp(*ty, result)
            }
        }
    }

    fn lower_binary(&mut self, f: &mut Function, op: flashcpp_lex::OperatorKind, lhs: ExprId, rhs: ExprId, ty: TypeIndex) -> TypedValue {
        use flashcpp_lex::OperatorKind::*;
        let lhs_val = self.lower_expr(f, lhs);
        let rhs_val = self.lower_expr(f, rhs);
        let result = f.new_temp();
        match op {
            Eq | NotEq | Lt | Gt | LtEq | GtEq => {
                f.push(Instruction::Compare { op: cmp_from_op(op), lhs: lhs_val, rhs: rhs_val, result });
            }
            _ => {
                f.push(Instruction::BinaryOp { op: binop_from_op(op), lhs: lhs_val, rhs: rhs_val, result });
            }
        }
        TypedValue::temp(ty, result)
    }

    fn lower_unary(&mut self, f: &mut Function, op: flashcpp_lex::OperatorKind, operand: ExprId, is_postfix: bool, ty: TypeIndex) -> TypedValue {
        use flashcpp_lex::OperatorKind::*;
        match op {
            Star => {
                let ptr = self.lower_expr(f, operand);
                let result = f.new_temp();
                f.push(Instruction::Dereference { pointer: ptr, result });
                TypedValue::temp(ty, result)
            }
            Amp => {
                let target = self.lower_place(f, operand);
                self.address_of_lvalue(f, target)
            }
            Inc | Dec => {
                let target = self.lower_place(f, operand);
                let current = self.load_lvalue_ref(f, &target);
                let one = TypedValue::int_const(current.ty, 1);
                let result = f.new_temp();
                let bin_op = if op == Inc { BinOpKind::Add } else { BinOpKind::Sub };
                f.push(Instruction::BinaryOp { op: bin_op, lhs: current.clone(), rhs: one, result });
                let updated = TypedValue::temp(current.ty, result);
                self.store_lvalue(f, target, updated.clone());
                if is_postfix { current } else { updated }
            }
            _ => {
                let operand_val = self.lower_expr(f, operand);
                let result = f.new_temp();
                f.push(Instruction::UnaryOp { op: unop_from_op(op), operand: operand_val, result });
                TypedValue::temp(ty, result)
            }
        }
    }

    fn lower_call(&mut self, f: &mut Function, callee: ExprId, args: Vec<ExprId>, ty: TypeIndex) -> TypedValue {
        let lowered_args: Vec<TypedValue> = args.iter().map(|a| self.lower_expr(f, *a)).collect();
        let target = match &self.ast.exprs[callee].kind {
            ExprKind::IdentifierRef(name) => CallTarget::Direct(*name),
            ExprKind::QualifiedId(qid) => match qid.segments.last() {
                Some(seg) => CallTarget::Direct(seg.name),
                None => CallTarget::Direct(name_placeholder(self)),
            },
            _ => {
                let v = self.lower_expr(f, callee);
                CallTarget::Indirect(v)
            }
        };
        let uses_return_slot = self.table.is_class(ty);
        let result = if matches!(self.table.get(ty).kind, TypeKind::Void) { None } else { Some(f.new_temp()) };
        if let Some(r) = result {
            f.set_category(r, ValueCategory::PRValue { eligible_for_rvo: uses_return_slot, is_return_value: false });
        }
        f.push(Instruction::Call { callee: target, args: lowered_args, result, uses_return_slot, return_slot: None });
        match result {
            Some(r) => TypedValue::temp(ty, r),
            None => TypedValue { ty, operand: Operand::Null },
        }
    }
}

fn name_placeholder(builder: &mut Builder<'_>) -> StringHandle {
    builder.intern("<unresolved>")
}

fn classify_cast(table: &TypeTable, from: TypeIndex, to: TypeIndex, _kind: flashcpp_par::CastKind) -> CastKind {
    let from_float = table.is_floating_point(from);
    let to_float = table.is_floating_point(to);
    match (from_float, to_float) {
        (true, true) => CastKind::FloatToFloat,
        (true, false) if table.is_pointer(to) => CastKind::Bitcast,
        (true, false) => CastKind::FloatToInt,
        (false, true) => CastKind::IntToFloat,
        (false, false) if table.is_pointer(from) && table.is_pointer(to) => CastKind::PointerToPointer,
        (false, false) if table.is_pointer(from) => CastKind::PointerToInt,
        (false, false) if table.is_pointer(to) => CastKind::IntToPointer,
        (false, false) => CastKind::IntToInt,
    }
}

fn cmp_from_op(op: flashcpp_lex::OperatorKind) -> CmpOp {
    use flashcpp_lex::OperatorKind::*;
    match op {
        Eq => CmpOp::Eq,
        NotEq => CmpOp::Ne,
        Lt => CmpOp::Lt,
        LtEq => CmpOp::Le,
        Gt => CmpOp::Gt,
        GtEq => CmpOp::Ge,
        _ => CmpOp::Eq,
    }
}

fn binop_from_op(op: flashcpp_lex::OperatorKind) -> BinOpKind {
    use flashcpp_lex::OperatorKind::*;
    match op {
        Plus => BinOpKind::Add,
        Minus => BinOpKind::Sub,
        Star => BinOpKind::Mul,
        Slash => BinOpKind::Div,
        Percent => BinOpKind::Rem,
        Amp => BinOpKind::And,
        Pipe => BinOpKind::Or,
        Caret => BinOpKind::Xor,
        Shl => BinOpKind::Shl,
        Shr => BinOpKind::Shr,
        AndAnd => BinOpKind::LogicalAnd,
        OrOr => BinOpKind::LogicalOr,
        _ => BinOpKind::Add,
    }
}

fn compound_to_binop(op: flashcpp_lex::OperatorKind) -> BinOpKind {
    use flashcpp_lex::OperatorKind::*;
    match op {
        PlusEq => BinOpKind::Add,
        MinusEq => BinOpKind::Sub,
        StarEq => BinOpKind::Mul,
        SlashEq => BinOpKind::Div,
        PercentEq => BinOpKind::Rem,
        AmpEq => BinOpKind::And,
        PipeEq => BinOpKind::Or,
        CaretEq => BinOpKind::Xor,
        ShlEq => BinOpKind::Shl,
        ShrEq => BinOpKind::Shr,
        _ => BinOpKind::Add,
    }
}

fn unop_from_op(op: flashcpp_lex::OperatorKind) -> UnOpKind {
    use flashcpp_lex::OperatorKind::*;
    match op {
        Minus => UnOpKind::Neg,
        LogicalNot => UnOpKind::Not,
        Tilde => UnOpKind::BitNot,
        _ => UnOpKind::Neg,
    }
}

fn temp_of(value: &TypedValue) -> Option<TempVar> {
    match value.operand {
        Operand::Temp(t) => Some(t),
        _ => None,
    }
}

pub fn build(
    ast: &Ast,
    table: &mut TypeTable,
    interner: &mut StringInterner,
    handler: &Handler,
    target: Target,
) -> TranslationUnit {
    Builder::new(ast, table, interner, handler, target).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcpp_par::Parser;

    fn build_source(src: &str) -> TranslationUnit {
        let mut interner = StringInterner::new();
        let mut handler = Handler::new();
        let mut ast = {
            let parser = Parser::new(src, &mut handler, &mut interner);
            parser.parse()
        };
        let (mut table, _env) = flashcpp_sem::analyze(&mut ast, &interner, &handler);
        build(&ast, &mut table, &mut interner, &handler, Target::Linux)
    }

    #[test]
    fn function_lowers_to_one_ir_function() {
        let tu = build_source("int add(int a, int b) { return a + b; }");
        assert_eq!(tu.functions.len(), 1);
    }

    #[test]
    fn function_decl_is_first_instruction() {
        let tu = build_source("int f() { return 1; }");
        let (_, func) = &tu.functions[0];
        assert!(matches!(func.instructions[0], Instruction::FunctionDecl(_)));
    }

    #[test]
    fn if_statement_emits_a_conditional_branch() {
        let tu = build_source("void f(int x) { if (x) { x = 1; } }");
        let (_, func) = &tu.functions[0];
        assert!(func.instructions.iter().any(|i| matches!(i, Instruction::CondBranch { .. })));
    }

    #[test]
    fn global_variable_becomes_a_global_decl() {
        let tu = build_source("int counter = 0;");
        assert_eq!(tu.globals.len(), 1);
    }
}
