//! Merge generator layout and quantization attributes into IO tensors.

use rknn_core::{DataType, QuantInfo, TensorId};
use serde::Serialize;

use crate::generator::GeneratorInfo;
use crate::metadata::NormTensor;

/// Model input or output as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IoTensor {
    pub tensor_id: TensorId,
    pub name: String,
    pub size: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtype: Option<DataType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_ori: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quant_info: Option<QuantInfo>,
}

impl From<&NormTensor> for IoTensor {
    fn from(t: &NormTensor) -> Self {
        Self {
            tensor_id: t.tensor_id,
            name: t.url.clone(),
            size: t.size.clone(),
            dtype: t.dtype.clone(),
            layout: t.layout.clone(),
            layout_ori: None,
            quant_info: None,
        }
    }
}

/// Merged inputs and outputs, each in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedIo {
    pub inputs: Vec<IoTensor>,
    pub outputs: Vec<IoTensor>,
}

pub fn merge_io(
    inputs: &[NormTensor],
    outputs: &[NormTensor],
    generator: Option<&GeneratorInfo>,
) -> MergedIo {
    let merge = |list: &[NormTensor]| -> Vec<IoTensor> {
        list.iter()
            .map(|t| {
                let mut io = IoTensor::from(t);
                if let Some(generator) = generator {
                    apply(&mut io, generator);
                }
                io
            })
            .collect()
    };
    MergedIo {
        inputs: merge(inputs),
        outputs: merge(outputs),
    }
}

fn apply(io: &mut IoTensor, generator: &GeneratorInfo) {
    if let Some(attrs) = generator.attrs.get(&io.name) {
        if attrs.layout.is_some() {
            io.layout = attrs.layout.clone();
        }
        io.layout_ori = attrs.layout_ori.clone();
    }
    if let Some(quant) = generator.quant_tab.get(&io.name) {
        if let Some(dtype) = &quant.dtype {
            io.dtype = Some(dtype.clone());
        }
        io.quant_info = Some(quant.quant_info());
    }
}
