pub mod detector_factory;
pub mod model_resolver;
pub mod nms;
pub mod onnx_blazeface_detector;
pub mod onnx_session;
pub mod onnx_yolo_detector;
