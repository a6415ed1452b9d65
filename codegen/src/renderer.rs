//! The code-generating visitor.
//!
//! Each canonical function is walked exactly once, depth first, emitting
//! Cranelift instructions into a fresh function. The input IR is never
//! mutated; the output [`NativeModule`] shares nothing with it.

use std::collections::HashMap;

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::instructions::BlockArg;
use cranelift_codegen::ir::{
    AbiParam, ConstantData, ExtFuncData, ExternalName, FuncRef, Function, InstBuilder, Signature, StackSlotData,
    StackSlotKind, UserExternalName, UserFuncName, Value, types as cl_types,
};
use cranelift_codegen::isa::CallConv;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};

use ingot_dtype::ScalarType;
use ingot_ir::{
    Arena, BufferId, CallKind, Expr, ExprId, LoopKind, LoweredFunc, Module, Param, ParamKind, ReturnKind, TensorId,
};

use crate::error::{Error, Result};
use crate::helpers::{VarScope, linear_offset, row_major_strides};
use crate::module::{NativeFunc, NativeModule};
use crate::ops;
use crate::symbols::{NS_EXTERN, NS_FUNC, SymbolTable};
use crate::types::scalar_to_cl_type;

/// Fused multiply-add intrinsic the pipeline's intrinsic lowering emits.
const FMA_INTRINSIC: &str = "fma";

/// Compile a canonical module into native instructions.
///
/// Registers every global buffer, function, and per-function buffer/tensor
/// name in the symbol table first, so duplicate definitions fail before any
/// instruction is emitted for the offending name.
pub fn compile_module(module: &Module) -> Result<NativeModule> {
    let mut symbols = SymbolTable::new();
    for buffer in &module.globals {
        symbols.define_buffer(&buffer.name)?;
    }
    for func in &module.functions {
        symbols.define_function(&func.name)?;
    }

    let mut func_ctx = FunctionBuilderContext::new();
    let mut compiled = Vec::with_capacity(module.functions.len());
    for (index, func) in module.functions.iter().enumerate() {
        tracing::debug!(function = %func.name, "compiling function");
        let native = compile_one(func, index as u32, &mut symbols, &mut func_ctx)?;
        compiled.push(NativeFunc { name: func.name.clone(), func: native });
    }
    let (extern_symbols, string_table) = symbols.into_tables();
    Ok(NativeModule::new(module.name.clone(), compiled, extern_symbols, string_table))
}

/// Compile a single canonical function as a one-function module.
pub fn compile_func(func: &LoweredFunc) -> Result<NativeModule> {
    let mut symbols = SymbolTable::new();
    symbols.define_function(&func.name)?;
    let mut func_ctx = FunctionBuilderContext::new();
    let native = compile_one(func, 0, &mut symbols, &mut func_ctx)?;
    let compiled = vec![NativeFunc { name: func.name.clone(), func: native }];
    let (extern_symbols, string_table) = symbols.into_tables();
    Ok(NativeModule::new(func.name.clone(), compiled, extern_symbols, string_table))
}

fn compile_one(
    func: &LoweredFunc,
    index: u32,
    symbols: &mut SymbolTable,
    func_ctx: &mut FunctionBuilderContext,
) -> Result<Function> {
    for (_, buffer) in func.arena.buffers() {
        symbols.define_buffer(&buffer.name)?;
    }
    symbols.reset_tensors();
    for (_, tensor) in func.arena.tensors() {
        symbols.define_tensor(&tensor.name)?;
    }

    let mut sig = Signature::new(CallConv::SystemV);
    for param in &func.params {
        match param.kind {
            ParamKind::Buffer(_) => sig.params.push(AbiParam::new(cl_types::I64)),
            ParamKind::Scalar(ty) => sig.params.push(AbiParam::new(scalar_to_cl_type(ty)?)),
        }
    }
    if func.ret == ReturnKind::Status {
        sig.returns.push(AbiParam::new(cl_types::I32));
    }

    let mut native = Function::with_name_signature(UserFuncName::user(NS_FUNC, index), sig);
    {
        let mut builder = FunctionBuilder::new(&mut native, func_ctx);
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        builder.seal_block(entry);

        let mut cg = FuncGen {
            builder,
            arena: &func.arena,
            symbols,
            storage: HashMap::new(),
            alloc_state: HashMap::new(),
            vars: VarScope::new(),
            func_refs: HashMap::new(),
            call_values: HashMap::new(),
        };

        // Parameters bind to entry-point values: buffers as base pointers,
        // scalars under their parameter name.
        let params: Vec<Value> = cg.builder.block_params(entry).to_vec();
        for (param, value) in func.params.iter().zip(params) {
            cg.bind_param(param, value);
        }

        cg.emit_stmt(func.body)?;
        cg.check_alloc_balance()?;

        match func.ret {
            ReturnKind::Void => {
                cg.builder.ins().return_(&[]);
            }
            ReturnKind::Status => {
                let ok = cg.builder.ins().iconst(cl_types::I32, 0);
                cg.builder.ins().return_(&[ok]);
            }
        }
        let FuncGen { builder, .. } = cg;
        builder.finalize();
    }
    Ok(native)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AllocState {
    Live,
    Freed,
}

struct FuncGen<'a, 'b> {
    builder: FunctionBuilder<'b>,
    arena: &'a Arena,
    symbols: &'a mut SymbolTable,
    /// Buffer name -> base pointer for every buffer with live storage.
    storage: HashMap<String, Value>,
    /// Alloc/Free bookkeeping for locally allocated buffers.
    alloc_state: HashMap<String, AllocState>,
    vars: VarScope,
    func_refs: HashMap<String, FuncRef>,
    /// Emitted call results; a call referenced by several projections is
    /// emitted once.
    call_values: HashMap<ExprId, Value>,
}

impl FuncGen<'_, '_> {
    fn bind_param(&mut self, param: &Param, value: Value) {
        match param.kind {
            ParamKind::Buffer(buffer) => {
                let name = self.arena.buffer(buffer).name.clone();
                self.storage.insert(name, value);
            }
            ParamKind::Scalar(_) => self.vars.push(param.name.clone(), value),
        }
    }

    fn check_alloc_balance(&self) -> Result<()> {
        for (name, state) in &self.alloc_state {
            if *state == AllocState::Live {
                return Err(Error::UnbalancedResource { name: name.clone(), detail: "alloc without matching free" });
            }
        }
        Ok(())
    }

    fn value_type(&self, id: ExprId) -> Result<ScalarType> {
        self.arena
            .type_of(id)
            .ok_or_else(|| Error::Missing { what: format!("value type for {:?}", self.arena.expr(id)) })
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn emit_stmt(&mut self, id: ExprId) -> Result<()> {
        match self.arena.expr(id) {
            Expr::Block { stmts } => {
                for stmt in stmts.clone() {
                    self.emit_stmt(stmt)?;
                }
                Ok(())
            }
            Expr::Store { tensor, indices, value } => {
                let (tensor, indices, value) = (*tensor, indices.clone(), *value);
                self.emit_store(tensor, &indices, value)
            }
            Expr::ShallowStore { value, .. } => {
                // The callee performed the write; evaluate the projection for
                // effect only.
                let value = *value;
                self.emit_expr(value).map(|_| ())
            }
            Expr::Alloc { buffer } => self.emit_alloc(*buffer),
            Expr::Free { buffer } => self.emit_free(*buffer),
            Expr::For { var, extent, body, kind } => {
                let (var, extent, body, kind) = (*var, *extent, *body, *kind);
                if let LoopKind::Bound(axis) = kind {
                    return Err(Error::UnsupportedConstruct {
                        what: format!("loop bound to accelerator axis {axis:?} in the native backend"),
                    });
                }
                self.emit_for(var, extent, body)
            }
            Expr::IfThenElse { cond, then_case, else_case } => {
                let (cond, then_case, else_case) = (*cond, *then_case, *else_case);
                self.emit_if(cond, then_case, else_case)
            }
            Expr::Call { .. } => self.emit_call(id).map(|_| ()),
            Expr::PolyFor { .. } | Expr::ScheduleBlock { .. } => Err(Error::UnsupportedConstruct {
                what: "schedule-style construct survived the pipeline".into(),
            }),
            _ => self.emit_expr(id).map(|_| ()),
        }
    }

    fn emit_store(&mut self, tensor: TensorId, indices: &[ExprId], value: ExprId) -> Result<()> {
        let (addr, elem, lanes) = self.tensor_address(tensor, indices)?;
        let value_ty = self.value_type(value)?;
        if value_ty.base() != elem.base() {
            return Err(Error::TypeError {
                detail: format!("stored value has type {value_ty}, buffer element is {elem}"),
            });
        }
        if value_ty.lanes != lanes {
            return Err(Error::TypeError {
                detail: format!("stored value has {} lanes, address has {lanes}", value_ty.lanes),
            });
        }
        let value = self.emit_expr(value)?;
        self.builder.ins().store(ops::mem_flags(), value, addr, 0);
        Ok(())
    }

    fn emit_alloc(&mut self, buffer: BufferId) -> Result<()> {
        let buffer = self.arena.buffer(buffer).clone();
        match self.alloc_state.get(buffer.name.as_str()) {
            Some(AllocState::Live) => {
                return Err(Error::UnbalancedResource { name: buffer.name, detail: "alloc of live buffer" });
            }
            _ if self.storage.contains_key(buffer.name.as_str()) => {
                return Err(Error::UnbalancedResource {
                    name: buffer.name,
                    detail: "alloc of buffer that already has storage",
                });
            }
            _ => {}
        }
        let elements = buffer.element_count().ok_or_else(|| Error::UnsupportedConstruct {
            what: format!("buffer `{}` has an unresolved symbolic shape", buffer.name),
        })?;
        let size = elements as u64 * buffer.elem.bytes() as u64;
        let align_shift = buffer.effective_alignment().trailing_zeros() as u8;
        let slot = self
            .builder
            .create_sized_stack_slot(StackSlotData::new(StackSlotKind::ExplicitSlot, size as u32, align_shift));
        let base = self.builder.ins().stack_addr(cl_types::I64, slot, 0);
        self.storage.insert(buffer.name.clone(), base);
        self.alloc_state.insert(buffer.name, AllocState::Live);
        Ok(())
    }

    fn emit_free(&mut self, buffer: BufferId) -> Result<()> {
        let name = self.arena.buffer(buffer).name.clone();
        match self.alloc_state.get(name.as_str()) {
            Some(AllocState::Live) => {
                self.alloc_state.insert(name.clone(), AllocState::Freed);
                self.storage.remove(name.as_str());
                Ok(())
            }
            Some(AllocState::Freed) => Err(Error::UnbalancedResource { name, detail: "double free" }),
            None => Err(Error::UnbalancedResource { name, detail: "free without matching alloc" }),
        }
    }

    /// Counted loop: header/body/exit blocks with the induction variable as
    /// a header block parameter.
    fn emit_for(&mut self, var: ExprId, extent: ExprId, body: ExprId) -> Result<()> {
        let Expr::Var { name, .. } = self.arena.expr(var).clone() else {
            return Err(Error::UnsupportedConstruct { what: "loop variable is not a Var".into() });
        };
        let extent_ty = self.value_type(extent)?;
        if !extent_ty.is_int() {
            return Err(Error::TypeError { detail: format!("loop extent has non-integer type {extent_ty}") });
        }
        let extent_val = self.emit_expr(extent)?;
        let cl_ty = scalar_to_cl_type(extent_ty)?;

        let header = self.builder.create_block();
        let body_block = self.builder.create_block();
        let exit = self.builder.create_block();
        self.builder.append_block_param(header, cl_ty);

        let zero = self.builder.ins().iconst(cl_ty, 0);
        let zero_arg: BlockArg = zero.into();
        self.builder.ins().jump(header, &[zero_arg]);

        self.builder.switch_to_block(header);
        let loop_var = self.builder.block_params(header)[0];
        let cc = if extent_ty.is_unsigned() { IntCC::UnsignedLessThan } else { IntCC::SignedLessThan };
        let cond = self.builder.ins().icmp(cc, loop_var, extent_val);
        let empty: &[BlockArg] = &[];
        self.builder.ins().brif(cond, body_block, empty, exit, empty);

        self.builder.switch_to_block(body_block);
        self.vars.push(name, loop_var);
        self.emit_stmt(body)?;
        self.vars.pop();

        let one = self.builder.ins().iconst(cl_ty, 1);
        let next = self.builder.ins().iadd(loop_var, one);
        let next_arg: BlockArg = next.into();
        self.builder.ins().jump(header, &[next_arg]);

        self.builder.seal_block(body_block);
        self.builder.seal_block(header);
        self.builder.switch_to_block(exit);
        self.builder.seal_block(exit);
        Ok(())
    }

    /// Conditional region with a merge point.
    fn emit_if(&mut self, cond: ExprId, then_case: ExprId, else_case: Option<ExprId>) -> Result<()> {
        let cond_ty = self.value_type(cond)?;
        if !cond_ty.is_bool() {
            return Err(Error::TypeError { detail: format!("condition has type {cond_ty}, expected bool") });
        }
        let cond_val = self.emit_expr(cond)?;

        let then_block = self.builder.create_block();
        let merge = self.builder.create_block();
        let else_block = else_case.map(|_| self.builder.create_block());

        let empty: &[BlockArg] = &[];
        self.builder.ins().brif(cond_val, then_block, empty, else_block.unwrap_or(merge), empty);

        self.builder.switch_to_block(then_block);
        self.builder.seal_block(then_block);
        self.emit_stmt(then_case)?;
        self.builder.ins().jump(merge, empty);

        if let (Some(else_block), Some(else_case)) = (else_block, else_case) {
            self.builder.switch_to_block(else_block);
            self.builder.seal_block(else_block);
            self.emit_stmt(else_case)?;
            self.builder.ins().jump(merge, empty);
        }

        self.builder.switch_to_block(merge);
        self.builder.seal_block(merge);
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn emit_expr(&mut self, id: ExprId) -> Result<Value> {
        match self.arena.expr(id).clone() {
            Expr::Imm { ty, value } => ops::emit_const(ty, value, &mut self.builder),
            Expr::StrImm { value } => {
                // Strings live in the module string table; the emitted value
                // is the table index the runtime resolves.
                let index = self.symbols.string_constant(&value);
                Ok(self.builder.ins().iconst(cl_types::I64, index as i64))
            }
            Expr::Var { name, .. } => {
                self.vars.get(&name).ok_or_else(|| Error::Missing { what: format!("binding for variable `{name}`") })
            }
            Expr::Binary { op, ty, lhs, rhs } => {
                let lt = self.value_type(lhs)?;
                let rt = self.value_type(rhs)?;
                if lt != rt {
                    return Err(Error::TypeError { detail: format!("binary operands differ: {lt} vs {rt}") });
                }
                if lt != ty {
                    return Err(Error::TypeError {
                        detail: format!("declared result type {ty} does not match operand type {lt}"),
                    });
                }
                let lhs = self.emit_expr(lhs)?;
                let rhs = self.emit_expr(rhs)?;
                Ok(ops::emit_binary(op, lhs, rhs, ty, &mut self.builder))
            }
            Expr::Compare { op, lhs, rhs } => {
                let lt = self.value_type(lhs)?;
                let rt = self.value_type(rhs)?;
                if lt != rt {
                    return Err(Error::TypeError {
                        detail: format!("comparison operands need a normalizing cast: {lt} vs {rt}"),
                    });
                }
                let lhs = self.emit_expr(lhs)?;
                let rhs = self.emit_expr(rhs)?;
                Ok(ops::emit_compare(op, lhs, rhs, lt, &mut self.builder))
            }
            Expr::Logical { op, lhs, rhs } => {
                for operand in [lhs, rhs] {
                    let ty = self.value_type(operand)?;
                    if !ty.is_bool() {
                        return Err(Error::TypeError { detail: format!("logical operand has type {ty}") });
                    }
                }
                let lhs = self.emit_expr(lhs)?;
                let rhs = self.emit_expr(rhs)?;
                Ok(ops::emit_logical(op, lhs, rhs, &mut self.builder))
            }
            Expr::Unary { op, operand } => {
                let ty = self.value_type(operand)?;
                if op == ingot_ir::UnaryOp::Not && !ty.is_bool() {
                    return Err(Error::TypeError { detail: format!("negation of non-boolean {ty}") });
                }
                if op == ingot_ir::UnaryOp::Neg && ty.is_unsigned() {
                    return Err(Error::TypeError { detail: format!("arithmetic negation of unsigned {ty}") });
                }
                let operand = self.emit_expr(operand)?;
                Ok(ops::emit_unary(op, operand, ty, &mut self.builder))
            }
            Expr::Cast { ty, value } => {
                let src_ty = self.value_type(value)?;
                let value = self.emit_expr(value)?;
                ops::emit_cast(value, src_ty, ty, &mut self.builder)
            }
            Expr::Ramp { base, stride, lanes } => self.emit_ramp(base, stride, lanes),
            Expr::Broadcast { value, lanes } => {
                let ty = self.value_type(value)?;
                let vec_ty = scalar_to_cl_type(ty.with_lanes(lanes))?;
                let value = self.emit_expr(value)?;
                Ok(self.builder.ins().splat(vec_ty, value))
            }
            Expr::Load { tensor, indices } => {
                let (addr, elem, lanes) = self.tensor_address(tensor, &indices)?;
                let cl_ty = scalar_to_cl_type(elem.with_lanes(lanes))?;
                Ok(self.builder.ins().load(cl_ty, ops::mem_flags(), addr, 0))
            }
            Expr::Call { .. } => self
                .emit_call(id)?
                .ok_or_else(|| Error::Missing { what: "value of a statement-position call".into() }),
            Expr::TupleGet { call, .. } => {
                // Every projection shares the one emitted call.
                self.emit_call(call)?
                    .ok_or_else(|| Error::Missing { what: "value of a multi-output call".into() })
            }
            Expr::BufferRef { buffer } => {
                let name = &self.arena.buffer(buffer).name;
                self.storage
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| Error::Missing { what: format!("storage for buffer `{name}`") })
            }
            Expr::TensorRef { tensor } => {
                let tensor = self.arena.tensor(tensor);
                let buffer = tensor.binding.ok_or_else(|| Error::UnboundResource { name: tensor.name.clone() })?;
                let name = &self.arena.buffer(buffer).name;
                self.storage
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| Error::Missing { what: format!("storage for buffer `{name}`") })
            }
            Expr::ArgPack { args } => {
                let (ptr, _len) = self.emit_arg_pack(&args)?;
                Ok(ptr)
            }
            Expr::AccelIndex { axis } => Err(Error::UnsupportedConstruct {
                what: format!("accelerator axis index {axis:?} in the native backend"),
            }),
            other => Err(Error::UnsupportedConstruct { what: format!("{other:?} has no value") }),
        }
    }

    /// `base + i * stride` per lane, as splat(base) + iota*stride.
    fn emit_ramp(&mut self, base: ExprId, stride: i64, lanes: u16) -> Result<Value> {
        let base_ty = self.value_type(base)?;
        if !base_ty.is_int() || base_ty.lanes != 1 {
            return Err(Error::TypeError { detail: format!("ramp base has type {base_ty}") });
        }
        let vec_ty = scalar_to_cl_type(base_ty.with_lanes(lanes))?;
        let base_val = self.emit_expr(base)?;
        let splat = self.builder.ins().splat(vec_ty, base_val);

        let mut bytes = Vec::with_capacity(base_ty.lane_bytes() * lanes as usize);
        for lane in 0..lanes as i64 {
            let v = lane * stride;
            bytes.extend_from_slice(&v.to_le_bytes()[..base_ty.lane_bytes()]);
        }
        let constant = self.builder.func.dfg.constants.insert(ConstantData::from(bytes));
        let iota = self.builder.ins().vconst(vec_ty, constant);
        Ok(self.builder.ins().iadd(splat, iota))
    }

    // =========================================================================
    // Memory addressing
    // =========================================================================

    /// Resolve a tensor access to (address, element type, lanes).
    ///
    /// The flattened offset is row-major against the bound buffer's shape,
    /// folded to a constant when every index is immediate. A unit-stride
    /// `Ramp` as the innermost index makes the access a vector access; its
    /// base drives the address.
    fn tensor_address(&mut self, tensor: TensorId, indices: &[ExprId]) -> Result<(Value, ScalarType, u16)> {
        let tensor = self.arena.tensor(tensor);
        let buffer_id = tensor.binding.ok_or_else(|| Error::UnboundResource { name: tensor.name.clone() })?;
        let buffer = self.arena.buffer(buffer_id).clone();

        if indices.len() != buffer.shape.len() {
            return Err(Error::TypeError {
                detail: format!(
                    "tensor `{}` indexed with {} indices, buffer `{}` has rank {}",
                    tensor.name,
                    indices.len(),
                    buffer.name,
                    buffer.shape.len()
                ),
            });
        }
        let extents: Vec<i64> = buffer
            .shape
            .iter()
            .map(|e| {
                e.as_const().ok_or_else(|| Error::UnsupportedConstruct {
                    what: format!("buffer `{}` has an unresolved symbolic shape", buffer.name),
                })
            })
            .collect::<Result<_>>()?;
        let base = self
            .storage
            .get(buffer.name.as_str())
            .copied()
            .ok_or_else(|| Error::Missing { what: format!("storage for buffer `{}`", buffer.name) })?;

        // Vector access: innermost index is a unit-stride ramp.
        let mut lanes = 1u16;
        let mut scalar_indices: Vec<ExprId> = Vec::with_capacity(indices.len());
        for (i, index) in indices.iter().enumerate() {
            match *self.arena.expr(*index) {
                Expr::Ramp { base, stride: 1, lanes: l } if i == indices.len() - 1 => {
                    lanes = l;
                    scalar_indices.push(base);
                }
                Expr::Ramp { .. } => {
                    return Err(Error::TypeError {
                        detail: "vector lane index must be a unit-stride innermost ramp".into(),
                    });
                }
                _ => {
                    let ty = self.value_type(*index)?;
                    if !ty.is_int() || ty.lanes != 1 {
                        return Err(Error::TypeError { detail: format!("index has non-integer type {ty}") });
                    }
                    scalar_indices.push(*index);
                }
            }
        }

        let elem_size = buffer.elem.bytes() as i64;
        let constant: Option<Vec<i64>> = scalar_indices
            .iter()
            .map(|id| self.arena.expr(*id).as_imm().and_then(|(_, lit)| lit.as_i64()))
            .collect();
        let byte_offset = match constant.and_then(|idx| linear_offset(&extents, &idx)) {
            Some(offset) => self.builder.ins().iconst(cl_types::I64, offset * elem_size),
            None => {
                let strides = row_major_strides(&extents);
                let mut offset = self.builder.ins().iconst(cl_types::I64, 0);
                for (index, stride) in scalar_indices.iter().zip(strides) {
                    let value = self.emit_expr(*index)?;
                    let value = self.index_to_i64(value, *index)?;
                    let stride_val = self.builder.ins().iconst(cl_types::I64, stride);
                    let term = self.builder.ins().imul(value, stride_val);
                    offset = self.builder.ins().iadd(offset, term);
                }
                let size_val = self.builder.ins().iconst(cl_types::I64, elem_size);
                self.builder.ins().imul(offset, size_val)
            }
        };
        let addr = self.builder.ins().iadd(base, byte_offset);
        Ok((addr, buffer.elem, lanes))
    }

    fn index_to_i64(&mut self, value: Value, id: ExprId) -> Result<Value> {
        let ty = self.value_type(id)?;
        Ok(if ty.bits == 64 {
            value
        } else if ty.is_signed() {
            self.builder.ins().sextend(cl_types::I64, value)
        } else {
            self.builder.ins().uextend(cl_types::I64, value)
        })
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Emit a call once; later references reuse the first result.
    fn emit_call(&mut self, id: ExprId) -> Result<Option<Value>> {
        if let Some(value) = self.call_values.get(&id) {
            return Ok(Some(*value));
        }
        let Expr::Call { name, args, ret, kind, .. } = self.arena.expr(id).clone() else {
            return Err(Error::Missing { what: "call node".into() });
        };

        if kind == CallKind::Intrinsic {
            let value = self.emit_intrinsic(&name, &args, ret)?;
            self.call_values.insert(id, value);
            return Ok(Some(value));
        }

        // Runtime calls take their packed argument array as (pointer, len).
        let mut arg_values = Vec::with_capacity(args.len() + 1);
        let mut sig = Signature::new(CallConv::SystemV);
        if kind == CallKind::Runtime
            && let Some(pack) = args.first()
            && let Expr::ArgPack { args: packed } = self.arena.expr(*pack).clone()
        {
            let (ptr, len) = self.emit_arg_pack(&packed)?;
            sig.params.push(AbiParam::new(cl_types::I64));
            sig.params.push(AbiParam::new(cl_types::I64));
            arg_values.push(ptr);
            arg_values.push(len);
        } else {
            for arg in &args {
                let ty = match self.arena.expr(*arg) {
                    Expr::StrImm { .. } | Expr::BufferRef { .. } | Expr::TensorRef { .. } => {
                        sig.params.push(AbiParam::new(cl_types::I64));
                        arg_values.push(self.emit_expr(*arg)?);
                        continue;
                    }
                    _ => self.value_type(*arg)?,
                };
                sig.params.push(AbiParam::new(scalar_to_cl_type(ty)?));
                arg_values.push(self.emit_expr(*arg)?);
            }
        }
        if let Some(ret_ty) = ret {
            sig.returns.push(AbiParam::new(scalar_to_cl_type(ret_ty)?));
        }

        let func_ref = self.func_ref(&name, sig);
        let call = self.builder.ins().call(func_ref, &arg_values);
        let results = self.builder.inst_results(call);
        let value = results.first().copied();
        if let Some(value) = value {
            self.call_values.insert(id, value);
        }
        Ok(value)
    }

    fn emit_intrinsic(&mut self, name: &str, args: &[ExprId], ret: Option<ScalarType>) -> Result<Value> {
        match name {
            FMA_INTRINSIC if args.len() == 3 => {
                let ty = ret.ok_or_else(|| Error::TypeError { detail: "fma needs a result type".into() })?;
                if !ty.is_float() {
                    return Err(Error::TypeError { detail: format!("fma over non-float {ty}") });
                }
                let a = self.emit_expr(args[0])?;
                let b = self.emit_expr(args[1])?;
                let c = self.emit_expr(args[2])?;
                Ok(self.builder.ins().fma(a, b, c))
            }
            _ => Err(Error::UnsupportedConstruct { what: format!("intrinsic `{name}` in the native backend") }),
        }
    }

    fn func_ref(&mut self, name: &str, sig: Signature) -> FuncRef {
        if let Some(func_ref) = self.func_refs.get(name) {
            return *func_ref;
        }
        let (namespace, index, colocated) = match self.symbols.function_index(name) {
            Some(index) => (NS_FUNC, index, true),
            None => (NS_EXTERN, self.symbols.extern_symbol(name), false),
        };
        let sigref = self.builder.func.import_signature(sig);
        let name_ref = self.builder.func.declare_imported_user_function(UserExternalName::new(namespace, index));
        let func_ref = self
            .builder
            .func
            .import_function(ExtFuncData { name: ExternalName::user(name_ref), signature: sigref, colocated });
        self.func_refs.insert(name.to_owned(), func_ref);
        func_ref
    }

    /// Lower a packed argument array to a stack array of 8-byte cells,
    /// returning (pointer, length).
    fn emit_arg_pack(&mut self, args: &[ExprId]) -> Result<(Value, Value)> {
        let size = (args.len().max(1) * 8) as u32;
        let slot = self.builder.create_sized_stack_slot(StackSlotData::new(StackSlotKind::ExplicitSlot, size, 3));
        for (i, arg) in args.iter().enumerate() {
            let value = self.emit_expr(*arg)?;
            let cell = self.to_cell(value, *arg)?;
            self.builder.ins().stack_store(cell, slot, (i * 8) as i32);
        }
        let ptr = self.builder.ins().stack_addr(cl_types::I64, slot, 0);
        let len = self.builder.ins().iconst(cl_types::I64, args.len() as i64);
        Ok((ptr, len))
    }

    /// Widen an argument value to its 8-byte pack cell.
    fn to_cell(&mut self, value: Value, id: ExprId) -> Result<Value> {
        let ty = match self.arena.expr(id) {
            // Pointers and string-table indices are already 64-bit.
            Expr::StrImm { .. } | Expr::BufferRef { .. } | Expr::TensorRef { .. } => return Ok(value),
            _ => self.value_type(id)?,
        };
        if ty.lanes != 1 {
            return Err(Error::TypeError { detail: format!("vector value {ty} in argument pack") });
        }
        Ok(match (ty.kind, ty.bits) {
            (ingot_dtype::TypeKind::Float, 64) => value,
            (ingot_dtype::TypeKind::Float, 32) => self.builder.ins().fpromote(cl_types::F64, value),
            (_, 64) => value,
            _ if ty.is_signed() => self.builder.ins().sextend(cl_types::I64, value),
            _ => self.builder.ins().uextend(cl_types::I64, value),
        })
    }
}
