//! FlatBuffers table accessors for the schema section.
//!
//! Mirrors what `flatc --rust` emits for:
//!
//! ```text
//! namespace rknn;
//!
//! table Model  { format:string; generator:string; compiler:string;
//!                runtime:string; source:string; graphs:[Graph]; }
//! table Graph  { tensors:[Tensor]; nodes:[Node]; inputs:[int]; outputs:[int]; }
//! table Tensor { name:string; shape:[int]; data_type:string; layout:string; is_const:bool; }
//! table Node   { type:string; name:string; inputs:[int]; outputs:[int]; }
//!
//! root_type Model;
//! ```

use flatbuffers::{
    Follow, ForwardsUOffset, InvalidFlatbuffer, Table, VOffsetT, Vector, Verifiable, Verifier,
};

macro_rules! fbs_table {
    ($name:ident) => {
        #[derive(Copy, Clone, PartialEq)]
        pub struct $name<'a> {
            pub _tab: Table<'a>,
        }

        impl<'a> Follow<'a> for $name<'a> {
            type Inner = $name<'a>;
            #[inline]
            unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
                Self {
                    _tab: Table::new(buf, loc),
                }
            }
        }
    };
}

fbs_table!(Model);
fbs_table!(Graph);
fbs_table!(Tensor);
fbs_table!(Node);

type Tables<'a, T> = Vector<'a, ForwardsUOffset<T>>;

impl<'a> Model<'a> {
    pub const VT_FORMAT: VOffsetT = 4;
    pub const VT_GENERATOR: VOffsetT = 6;
    pub const VT_COMPILER: VOffsetT = 8;
    pub const VT_RUNTIME: VOffsetT = 10;
    pub const VT_SOURCE: VOffsetT = 12;
    pub const VT_GRAPHS: VOffsetT = 14;

    #[inline]
    pub fn format(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_FORMAT, None) }
    }

    #[inline]
    pub fn generator(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_GENERATOR, None) }
    }

    #[inline]
    pub fn compiler(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_COMPILER, None) }
    }

    #[inline]
    pub fn runtime(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_RUNTIME, None) }
    }

    #[inline]
    pub fn source(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_SOURCE, None) }
    }

    #[inline]
    pub fn graphs(&self) -> Option<Tables<'a, Graph<'a>>> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Tables<'a, Graph<'a>>>>(Self::VT_GRAPHS, None)
        }
    }
}

impl Verifiable for Model<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("format", Self::VT_FORMAT, false)?
            .visit_field::<ForwardsUOffset<&str>>("generator", Self::VT_GENERATOR, false)?
            .visit_field::<ForwardsUOffset<&str>>("compiler", Self::VT_COMPILER, false)?
            .visit_field::<ForwardsUOffset<&str>>("runtime", Self::VT_RUNTIME, false)?
            .visit_field::<ForwardsUOffset<&str>>("source", Self::VT_SOURCE, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Graph>>>>(
                "graphs",
                Self::VT_GRAPHS,
                false,
            )?
            .finish();
        Ok(())
    }
}

impl<'a> Graph<'a> {
    pub const VT_TENSORS: VOffsetT = 4;
    pub const VT_NODES: VOffsetT = 6;
    pub const VT_INPUTS: VOffsetT = 8;
    pub const VT_OUTPUTS: VOffsetT = 10;

    #[inline]
    pub fn tensors(&self) -> Option<Tables<'a, Tensor<'a>>> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Tables<'a, Tensor<'a>>>>(Self::VT_TENSORS, None)
        }
    }

    #[inline]
    pub fn nodes(&self) -> Option<Tables<'a, Node<'a>>> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Tables<'a, Node<'a>>>>(Self::VT_NODES, None)
        }
    }

    #[inline]
    pub fn inputs(&self) -> Option<Vector<'a, i32>> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(Self::VT_INPUTS, None)
        }
    }

    #[inline]
    pub fn outputs(&self) -> Option<Vector<'a, i32>> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(Self::VT_OUTPUTS, None)
        }
    }
}

impl Verifiable for Graph<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Tensor>>>>(
                "tensors",
                Self::VT_TENSORS,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<Node>>>>(
                "nodes",
                Self::VT_NODES,
                false,
            )?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("inputs", Self::VT_INPUTS, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("outputs", Self::VT_OUTPUTS, false)?
            .finish();
        Ok(())
    }
}

impl<'a> Tensor<'a> {
    pub const VT_NAME: VOffsetT = 4;
    pub const VT_SHAPE: VOffsetT = 6;
    pub const VT_DATA_TYPE: VOffsetT = 8;
    pub const VT_LAYOUT: VOffsetT = 10;
    pub const VT_IS_CONST: VOffsetT = 12;

    #[inline]
    pub fn name(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_NAME, None) }
    }

    #[inline]
    pub fn shape(&self) -> Option<Vector<'a, i32>> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(Self::VT_SHAPE, None)
        }
    }

    #[inline]
    pub fn data_type(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_DATA_TYPE, None) }
    }

    #[inline]
    pub fn layout(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_LAYOUT, None) }
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<bool>(Self::VT_IS_CONST, Some(false)) }.unwrap_or(false)
    }
}

impl Verifiable for Tensor<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("shape", Self::VT_SHAPE, false)?
            .visit_field::<ForwardsUOffset<&str>>("data_type", Self::VT_DATA_TYPE, false)?
            .visit_field::<ForwardsUOffset<&str>>("layout", Self::VT_LAYOUT, false)?
            .visit_field::<bool>("is_const", Self::VT_IS_CONST, false)?
            .finish();
        Ok(())
    }
}

impl<'a> Node<'a> {
    pub const VT_TYPE: VOffsetT = 4;
    pub const VT_NAME: VOffsetT = 6;
    pub const VT_INPUTS: VOffsetT = 8;
    pub const VT_OUTPUTS: VOffsetT = 10;

    #[inline]
    pub fn type_(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_TYPE, None) }
    }

    #[inline]
    pub fn name(&self) -> Option<&'a str> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe { self._tab.get::<ForwardsUOffset<&str>>(Self::VT_NAME, None) }
    }

    #[inline]
    pub fn inputs(&self) -> Option<Vector<'a, i32>> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(Self::VT_INPUTS, None)
        }
    }

    #[inline]
    pub fn outputs(&self) -> Option<Vector<'a, i32>> {
        // SAFETY: the buffer was checked by `root_as_model`.
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, i32>>>(Self::VT_OUTPUTS, None)
        }
    }
}

impl Verifiable for Node<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("type", Self::VT_TYPE, false)?
            .visit_field::<ForwardsUOffset<&str>>("name", Self::VT_NAME, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("inputs", Self::VT_INPUTS, false)?
            .visit_field::<ForwardsUOffset<Vector<'_, i32>>>("outputs", Self::VT_OUTPUTS, false)?
            .finish();
        Ok(())
    }
}

/// Verify `buf` and return its root `Model` table.
#[inline]
pub fn root_as_model(buf: &[u8]) -> Result<Model<'_>, InvalidFlatbuffer> {
    flatbuffers::root::<Model>(buf)
}
