//! Generated protobuf/gRPC types for the rephraser service

tonic::include_proto!("rephraser");
