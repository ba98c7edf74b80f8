//! Data Transfer Objects (DTOs)
//!
//! Read models returned by the coordinator's fetch operations.

mod group_dto;

pub use group_dto::{
    GroupHistoryDto, GroupSnapshotDto, HistoryEntryDto, IcebergProgressDto, LegSnapshotDto,
    SquareOffDto,
};
