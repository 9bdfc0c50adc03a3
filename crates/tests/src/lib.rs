//! Integration test harness for Specular.
//!
//! Provides a scaffold for assembling shader programs in process and a
//! harness that wires them to an interpreter with the reference `glsl`
//! extension set, injects typed inputs and reads typed outputs back.

use specular_ext_registry::{glsl, StaticProvider};
use specular_module::{Id, Program, ProgramBuilder, StorageClass, TypeDesc};
use specular_runtime::{Interpreter, Result};

/// A program builder pre-seeded with the types most shaders need.
pub struct Scaffold {
    pub builder: ProgramBuilder,
    pub void: Id,
    pub boolean: Id,
    pub int: Id,
    pub float: Id,
    pub vec2: Id,
    pub vec3: Id,
    pub vec4: Id,
    /// `fn() -> void`, the shape of every entry point.
    pub void_fn: Id,
}

impl Scaffold {
    pub fn new() -> Self {
        let mut builder = ProgramBuilder::new();
        let void = builder.type_def(TypeDesc::Void);
        let boolean = builder.type_def(TypeDesc::Bool);
        let int = builder.type_def(TypeDesc::Int {
            width: 32,
            signed: true,
        });
        let float = builder.type_def(TypeDesc::Float { width: 32 });
        let vec2 = builder.type_def(TypeDesc::Vector {
            component: float,
            count: 2,
        });
        let vec3 = builder.type_def(TypeDesc::Vector {
            component: float,
            count: 3,
        });
        let vec4 = builder.type_def(TypeDesc::Vector {
            component: float,
            count: 4,
        });
        let void_fn = builder.type_def(TypeDesc::Function {
            ret: void,
            params: vec![],
        });
        Self {
            builder,
            void,
            boolean,
            int,
            float,
            vec2,
            vec3,
            vec4,
            void_fn,
        }
    }

    pub fn pointer(&mut self, pointee: Id, storage: StorageClass) -> Id {
        self.builder.type_def(TypeDesc::Pointer { pointee, storage })
    }

    /// Declare a named input variable of the given pointee type.
    pub fn input(&mut self, pointee: Id, name: &str) -> Id {
        let ptr = self.pointer(pointee, StorageClass::Input);
        let var = self.builder.global_variable(ptr, StorageClass::Input);
        self.builder.name(var, name);
        var
    }

    /// Declare a named output variable of the given pointee type.
    pub fn output(&mut self, pointee: Id, name: &str) -> Id {
        let ptr = self.pointer(pointee, StorageClass::Output);
        let var = self.builder.global_variable(ptr, StorageClass::Output);
        self.builder.name(var, name);
        var
    }

    /// Declare a named uniform-constant variable, e.g. a sampler.
    pub fn uniform(&mut self, pointee: Id, name: &str) -> Id {
        let ptr = self.pointer(pointee, StorageClass::UniformConstant);
        let var = self
            .builder
            .global_variable(ptr, StorageClass::UniformConstant);
        self.builder.name(var, name);
        var
    }

    pub fn build(self) -> Program {
        self.builder.build()
    }
}

impl Default for Scaffold {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps an interpreter set up with the reference `glsl` extension set.
pub struct TestHarness {
    interp: Interpreter,
}

impl TestHarness {
    /// Set up an interpreter for the program.
    ///
    /// # Panics
    ///
    /// Panics if extension resolution or constant initialization fails.
    pub fn from_program(program: Program) -> Self {
        let provider = StaticProvider::new().with_set(glsl::SET_NAME, glsl::table());
        let mut interp = Interpreter::new(program);
        interp.setup(&provider).expect("setup failed");
        Self { interp }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    /// Execute every entry point.
    ///
    /// # Panics
    ///
    /// Panics if the run fails.
    pub fn run(&mut self) {
        self.interp.run().expect("run failed");
    }

    pub fn try_run(&mut self) -> Result<()> {
        self.interp.run()
    }

    pub fn set_f32(&mut self, name: &str, value: f32) {
        self.set_bytes(name, &value.to_le_bytes());
    }

    pub fn set_f32s(&mut self, name: &str, values: &[f32]) {
        let bits: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.set_bytes(name, &bits);
    }

    pub fn set_i32(&mut self, name: &str, value: i32) {
        self.set_bytes(name, &value.to_le_bytes());
    }

    pub fn set_bool(&mut self, name: &str, value: bool) {
        self.set_bytes(name, &[value as u8]);
    }

    pub fn set_bytes(&mut self, name: &str, bits: &[u8]) {
        self.interp
            .set_variable_by_name(name, bits)
            .unwrap_or_else(|e| panic!("set {name}: {e}"));
    }

    pub fn read_f32(&self, name: &str) -> f32 {
        self.read_f32s(name, 1)[0]
    }

    pub fn read_f32s(&self, name: &str, count: usize) -> Vec<f32> {
        let bits = self.read_bytes(name);
        assert_eq!(bits.len(), count * 4, "{name} holds {} bytes", bits.len());
        bits.chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    pub fn read_i32(&self, name: &str) -> i32 {
        let bits = self.read_bytes(name);
        i32::from_le_bytes([bits[0], bits[1], bits[2], bits[3]])
    }

    pub fn read_bytes(&self, name: &str) -> Vec<u8> {
        self.interp
            .read_variable_by_name(name)
            .unwrap_or_else(|| panic!("variable {name} has no value"))
    }
}
