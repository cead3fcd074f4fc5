//! 경계 검사 커서 -- 프레임 바이트 접근의 유일한 통로
//!
//! 모든 헤더 필드 접근은 [`PacketView::take`]를 거칩니다.
//! `take`는 `cursor + N <= end`가 확인된 경우에만 바이트를 돌려주므로
//! 프레임 범위 밖의 메모리를 읽는 경로가 존재하지 않습니다.

use crate::parser::PassEarly;

/// 수신 프레임의 원시 바이트 소스
///
/// 유저스페이스에서는 `[u8]`, 커널에서는 `XdpContext`의 data/data_end 구간이
/// 이 trait을 구현합니다.
pub trait FrameBytes {
    /// `offset`부터 `N` 바이트를 읽습니다.
    ///
    /// `offset + N`이 프레임 끝을 넘으면 `None`을 반환하며,
    /// 이 경우 어떤 바이트도 읽지 않아야 합니다.
    fn load<const N: usize>(&self, offset: usize) -> Option<[u8; N]>;
}

impl FrameBytes for [u8] {
    #[inline(always)]
    fn load<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let end = offset.checked_add(N)?;
        let bytes = self.get(offset..end)?;
        <[u8; N]>::try_from(bytes).ok()
    }
}

/// 단일 프레임 위의 읽기 커서
///
/// 고정 길이 읽기만 제공하며 반복/재귀 없이 호출자가 정해진 순서로 전진합니다.
pub struct PacketView<'a, F: FrameBytes + ?Sized> {
    frame: &'a F,
    cursor: usize,
}

impl<'a, F: FrameBytes + ?Sized> PacketView<'a, F> {
    /// 프레임 시작(offset 0)에 커서를 둔 뷰를 생성합니다.
    #[inline(always)]
    pub fn new(frame: &'a F) -> Self {
        Self { frame, cursor: 0 }
    }

    /// 현재 커서 위치
    #[inline(always)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// 커서 위치의 `N` 바이트를 읽고 커서를 `N`만큼 전진시킵니다.
    ///
    /// 남은 바이트가 `N`보다 적으면 커서를 움직이지 않고
    /// [`PassEarly::Truncated`]를 반환합니다.
    #[inline(always)]
    pub fn take<const N: usize>(&mut self) -> Result<[u8; N], PassEarly> {
        let bytes = self
            .frame
            .load::<N>(self.cursor)
            .ok_or(PassEarly::Truncated)?;
        self.cursor += N;
        Ok(bytes)
    }

    /// 커서를 절대 위치 `pos`로 옮깁니다.
    ///
    /// 읽기를 수행하지 않으므로 프레임 밖을 가리켜도 안전하며,
    /// 다음 `take`에서 경계 검사로 걸러집니다.
    #[inline(always)]
    pub fn seek(&mut self, pos: usize) {
        self.cursor = pos;
    }
}
