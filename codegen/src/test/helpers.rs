use ingot_ir::{Arena, Buffer, ExprId, Extent, LoweredFunc, Param, ScalarType, Tensor, TensorId};

/// Function with one buffer parameter per `(name, elem, shape)` triple and a
/// tensor view bound to each; returns the builder inputs for the body.
pub struct FuncBuilder {
    pub arena: Arena,
    pub tensors: Vec<TensorId>,
    params: Vec<Param>,
}

impl FuncBuilder {
    pub fn new(buffers: &[(&str, ScalarType, &[i64])]) -> Self {
        let mut arena = Arena::new();
        let mut tensors = Vec::new();
        let mut params = Vec::new();
        for (name, elem, shape) in buffers {
            let extents: Vec<Extent> = shape.iter().map(|v| Extent::Const(*v)).collect();
            let buffer = arena.add_buffer(Buffer::new(format!("{name}_buf"), *elem, extents.clone()));
            tensors.push(arena.add_tensor(Tensor::new(*name, extents).bound_to(buffer)));
            params.push(Param::buffer(format!("{name}_buf"), buffer));
        }
        Self { arena, tensors, params }
    }

    pub fn finish(self, body: ExprId) -> LoweredFunc {
        LoweredFunc::new("test_fn", self.params, self.arena, body)
    }
}

/// Compile and return the rendered CLIF of the single function.
pub fn clif_of(func: &LoweredFunc) -> String {
    let module = crate::compile_func(func).expect("codegen should succeed");
    module.get("test_fn").expect("function should be present").clif()
}
