//! 按编解码器区分的缓存状态与 NAL 扫描.

use bytes::Bytes;
use log::debug;
use tao_core::{TaoError, TaoResult};

use super::cache::{ParameterSetTable, StoreOutcome};
use crate::parsers::h264::{self, NalUnitType, Pps, Sps};
use crate::parsers::h265::{self, HevcNalUnitType, HevcPps, HevcSps, HevcVps};

/// 单个 NAL 扫描后的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanStep {
    /// 继续扫描下一个 NAL
    Continue { changed: bool },
    /// 遇到第一个 slice, 本次扫描结束
    SliceFound { changed: bool },
}

/// H.264 参数集缓存
#[derive(Default)]
pub(crate) struct H264State {
    pub(crate) sps: ParameterSetTable<Sps>,
    pub(crate) pps: ParameterSetTable<Pps>,
    pub(crate) active_sps: Option<u32>,
    pub(crate) active_pps: Option<u32>,
}

impl H264State {
    /// 处理一个 NAL (至少 2 字节)
    pub(crate) fn scan_nal(&mut self, nal: &[u8]) -> TaoResult<ScanStep> {
        let nal_type = NalUnitType::from_type_id(nal[0] & 0x1F);
        match nal_type {
            NalUnitType::Sps => {
                let outcome = self.sps.store(nal)?;
                if let StoreOutcome::Changed(id) = outcome {
                    self.active_sps = Some(id);
                }
                Ok(ScanStep::Continue {
                    changed: outcome != StoreOutcome::Unchanged,
                })
            }
            NalUnitType::Pps => {
                let outcome = self.pps.store(nal)?;
                Ok(ScanStep::Continue {
                    changed: outcome != StoreOutcome::Unchanged,
                })
            }
            t if t.is_vcl() => {
                let changed = if self.sps.len() > 1 {
                    self.resolve_slice(nal)?
                } else {
                    self.note_slice_pps(nal);
                    false
                };
                Ok(ScanStep::SliceFound { changed })
            }
            _ => Ok(ScanStep::Continue { changed: false }),
        }
    }

    /// 由 slice 引用的 PPS 找到当前 SPS, 返回当前 SPS 是否改变
    fn resolve_slice(&mut self, nal: &[u8]) -> TaoResult<bool> {
        let pps_id = h264::slice_pps_id(nal).map_err(|e| e.eof_as_invalid("H.264 slice 头部"))?;
        let Some(pps) = self.pps.get(pps_id) else {
            return Err(TaoError::InvalidData(format!(
                "H.264: slice 引用了未缓存的 PPS, pps_id={}",
                pps_id
            )));
        };
        let sps_id = pps.sps_id;
        if self.sps.get(sps_id).is_none() {
            return Err(TaoError::InvalidData(format!(
                "H.264: PPS {} 引用了未缓存的 SPS, sps_id={}",
                pps_id, sps_id
            )));
        }

        self.active_pps = Some(pps_id);
        if self.active_sps == Some(sps_id) {
            return Ok(false);
        }
        debug!("H.264: 当前 SPS 切换为 {}", sps_id);
        self.active_sps = Some(sps_id);
        Ok(true)
    }

    /// 只有一个 SPS 时记录 slice 引用的 PPS, 头部损坏或 PPS 未缓存则忽略
    fn note_slice_pps(&mut self, nal: &[u8]) {
        match h264::slice_pps_id(nal) {
            Ok(pps_id) if self.pps.get(pps_id).is_some() => self.active_pps = Some(pps_id),
            _ => {}
        }
    }

    /// 当前 SPS
    pub(crate) fn active_sps(&self) -> Option<&Sps> {
        self.sps.get(self.active_sps?)
    }
}

/// HEVC 参数集缓存
#[derive(Default)]
pub(crate) struct HevcState {
    pub(crate) vps: ParameterSetTable<HevcVps>,
    pub(crate) sps: ParameterSetTable<HevcSps>,
    pub(crate) pps: ParameterSetTable<HevcPps>,
    pub(crate) active_vps: Option<u32>,
    pub(crate) active_sps: Option<u32>,
    /// hvcC 渲染得到的 Annex B 配置
    pub(crate) annexb_config: Option<Bytes>,
}

impl HevcState {
    /// 处理一个 NAL (至少 2 字节)
    pub(crate) fn scan_nal(&mut self, nal: &[u8]) -> TaoResult<ScanStep> {
        if h265::nal::nal_layer_id(nal) > 0 {
            return Ok(ScanStep::Continue { changed: false });
        }

        let nal_type = HevcNalUnitType::from_type_id((nal[0] >> 1) & 0x3F);
        match nal_type {
            HevcNalUnitType::Vps => {
                let outcome = self.vps.store(nal)?;
                if let StoreOutcome::Changed(id) = outcome {
                    self.active_vps = Some(id);
                }
                Ok(ScanStep::Continue {
                    changed: outcome != StoreOutcome::Unchanged,
                })
            }
            HevcNalUnitType::Sps => {
                let outcome = self.sps.store(nal)?;
                if let StoreOutcome::Changed(id) = outcome {
                    self.active_sps = Some(id);
                }
                Ok(ScanStep::Continue {
                    changed: outcome != StoreOutcome::Unchanged,
                })
            }
            HevcNalUnitType::Pps => {
                let outcome = self.pps.store(nal)?;
                Ok(ScanStep::Continue {
                    changed: outcome != StoreOutcome::Unchanged,
                })
            }
            t if t.is_slice_segment() => {
                let changed = if self.sps.len() > 1 || self.vps.len() > 1 {
                    self.resolve_slice(nal)?
                } else {
                    false
                };
                Ok(ScanStep::SliceFound { changed })
            }
            _ => Ok(ScanStep::Continue { changed: false }),
        }
    }

    /// 由 slice 引用的 PPS 找到当前 SPS 与 VPS, 返回两者是否改变
    ///
    /// VPS id 取自 SPS, 不要求该 VPS 已缓存.
    fn resolve_slice(&mut self, nal: &[u8]) -> TaoResult<bool> {
        let pps_id = h265::slice_pps_id(nal).map_err(|e| e.eof_as_invalid("HEVC slice 头部"))?;
        let Some(pps) = self.pps.get(pps_id) else {
            return Err(TaoError::InvalidData(format!(
                "HEVC: slice 引用了未缓存的 PPS, pps_id={}",
                pps_id
            )));
        };
        let sps_id = pps.sps_id;
        let Some(sps) = self.sps.get(sps_id) else {
            return Err(TaoError::InvalidData(format!(
                "HEVC: PPS {} 引用了未缓存的 SPS, sps_id={}",
                pps_id, sps_id
            )));
        };
        let vps_id = u32::from(sps.vps_id);

        if self.active_sps == Some(sps_id) && self.active_vps == Some(vps_id) {
            return Ok(false);
        }
        debug!("HEVC: 当前参数集切换为 SPS {} / VPS {}", sps_id, vps_id);
        self.active_sps = Some(sps_id);
        self.active_vps = Some(vps_id);
        Ok(true)
    }

    /// 当前 SPS
    pub(crate) fn active_sps(&self) -> Option<&HevcSps> {
        self.sps.get(self.active_sps?)
    }
}

/// 按编解码器区分的状态
pub(crate) enum CodecState {
    H264(H264State),
    Hevc(HevcState),
}

impl CodecState {
    pub(crate) fn scan_nal(&mut self, nal: &[u8]) -> TaoResult<ScanStep> {
        match self {
            Self::H264(state) => state.scan_nal(nal),
            Self::Hevc(state) => state.scan_nal(nal),
        }
    }
}
