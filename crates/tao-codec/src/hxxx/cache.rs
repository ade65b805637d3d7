//! 参数集缓存.
//!
//! 每种参数集 (H.264 SPS/PPS, HEVC VPS/SPS/PPS) 各有一张按 id 直接索引的定长表.
//! 槽位同时保存 NAL 原始字节与解析结果, 原始字节用于去重.

use log::debug;
use tao_core::{TaoError, TaoResult};

use crate::parsers::{h264, h265};

/// 可缓存的参数集
pub trait ParameterSet: Sized {
    /// 日志与错误信息中的名称
    const KIND: &'static str;
    /// id 上限 (含)
    const MAX_ID: u32;

    /// 从完整 NAL 读取 id, 不做完整解析
    fn peek_id(nal: &[u8]) -> TaoResult<u32>;

    /// 从完整 NAL (含头部, 未去除防竞争字节) 解析
    fn decode(nal: &[u8]) -> TaoResult<Self>;

    /// 解析结果中的 id
    fn id(&self) -> u32;
}

impl ParameterSet for h264::Sps {
    const KIND: &'static str = "H.264 SPS";
    const MAX_ID: u32 = h264::MAX_SPS_ID;

    fn peek_id(nal: &[u8]) -> TaoResult<u32> {
        h264::sps::peek_sps_id(nal)
    }

    fn decode(nal: &[u8]) -> TaoResult<Self> {
        Self::from_nal(nal)
    }

    fn id(&self) -> u32 {
        self.sps_id
    }
}

impl ParameterSet for h264::Pps {
    const KIND: &'static str = "H.264 PPS";
    const MAX_ID: u32 = h264::MAX_PPS_ID;

    fn peek_id(nal: &[u8]) -> TaoResult<u32> {
        h264::pps::peek_pps_id(nal)
    }

    fn decode(nal: &[u8]) -> TaoResult<Self> {
        Self::from_nal(nal)
    }

    fn id(&self) -> u32 {
        self.pps_id
    }
}

impl ParameterSet for h265::HevcVps {
    const KIND: &'static str = "HEVC VPS";
    const MAX_ID: u32 = h265::sps::MAX_VPS_ID;

    fn peek_id(nal: &[u8]) -> TaoResult<u32> {
        h265::sps::peek_vps_id(nal)
    }

    fn decode(nal: &[u8]) -> TaoResult<Self> {
        Self::from_nal(nal)
    }

    fn id(&self) -> u32 {
        u32::from(self.vps_id)
    }
}

impl ParameterSet for h265::HevcSps {
    const KIND: &'static str = "HEVC SPS";
    const MAX_ID: u32 = h265::sps::MAX_SPS_ID;

    fn peek_id(nal: &[u8]) -> TaoResult<u32> {
        h265::sps::peek_sps_id(nal)
    }

    fn decode(nal: &[u8]) -> TaoResult<Self> {
        Self::from_nal(nal)
    }

    fn id(&self) -> u32 {
        self.sps_id
    }
}

impl ParameterSet for h265::HevcPps {
    const KIND: &'static str = "HEVC PPS";
    const MAX_ID: u32 = h265::pps::MAX_PPS_ID;

    fn peek_id(nal: &[u8]) -> TaoResult<u32> {
        h265::pps::peek_pps_id(nal)
    }

    fn decode(nal: &[u8]) -> TaoResult<Self> {
        Self::from_nal(nal)
    }

    fn id(&self) -> u32 {
        self.pps_id
    }
}

/// 存入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// 新参数集, 或覆盖了同 id 的旧参数集
    Changed(u32),
    /// 与已缓存的某个参数集逐字节相同, 未解析
    Unchanged,
}

struct Slot<P> {
    raw: Vec<u8>,
    decoded: P,
}

/// 按 id 索引的参数集表
pub struct ParameterSetTable<P> {
    slots: Vec<Option<Slot<P>>>,
    occupied: usize,
}

impl<P: ParameterSet> Default for ParameterSetTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ParameterSet> ParameterSetTable<P> {
    /// 创建空表, 容量为 `P::MAX_ID + 1`
    pub fn new() -> Self {
        Self {
            slots: (0..=P::MAX_ID).map(|_| None).collect(),
            occupied: 0,
        }
    }

    /// 存入一个参数集 NAL
    ///
    /// 解析失败时表保持不变.
    pub fn store(&mut self, nal: &[u8]) -> TaoResult<StoreOutcome> {
        let id = P::peek_id(nal).map_err(|e| e.eof_as_invalid(P::KIND))?;
        if id > P::MAX_ID {
            return Err(TaoError::InvalidData(format!(
                "{} id 超出范围, id={}, max={}",
                P::KIND,
                id,
                P::MAX_ID
            )));
        }

        if self.contains_raw(nal) {
            return Ok(StoreOutcome::Unchanged);
        }

        let decoded = P::decode(nal).map_err(|e| e.eof_as_invalid(P::KIND))?;
        if decoded.id() != id {
            return Err(TaoError::InvalidData(format!(
                "{} id 不一致, peek={}, decoded={}",
                P::KIND,
                id,
                decoded.id()
            )));
        }

        let slot = &mut self.slots[id as usize];
        match slot {
            Some(existing) => {
                existing.raw.clear();
                existing.raw.try_reserve(nal.len())?;
                existing.raw.extend_from_slice(nal);
                existing.decoded = decoded;
            }
            None => {
                let mut raw = Vec::new();
                raw.try_reserve_exact(nal.len())?;
                raw.extend_from_slice(nal);
                *slot = Some(Slot { raw, decoded });
                self.occupied += 1;
            }
        }

        debug!("新的 {} 已解析: id={}", P::KIND, id);
        Ok(StoreOutcome::Changed(id))
    }

    /// 扫描已占用的槽位, 查找逐字节相同的原始数据
    fn contains_raw(&self, nal: &[u8]) -> bool {
        self.slots
            .iter()
            .flatten()
            .take(self.occupied)
            .any(|slot| slot.raw == nal)
    }

    /// 按 id 查找解析结果
    pub fn get(&self, id: u32) -> Option<&P> {
        self.slot(id).map(|slot| &slot.decoded)
    }

    /// 按 id 查找原始 NAL
    pub fn raw(&self, id: u32) -> Option<&[u8]> {
        self.slot(id).map(|slot| slot.raw.as_slice())
    }

    fn slot(&self, id: u32) -> Option<&Slot<P>> {
        self.slots.get(usize::try_from(id).ok()?)?.as_ref()
    }

    /// 已占用槽位数
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// 表是否为空
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// 按 id 升序遍历已占用的槽位: `(id, 原始 NAL, 解析结果)`
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[u8], &P)> {
        self.slots
            .iter()
            .zip(0u32..)
            .filter_map(|(slot, id)| {
                slot.as_ref()
                    .map(|slot| (id, slot.raw.as_slice(), &slot.decoded))
            })
            .take(self.occupied)
    }
}
