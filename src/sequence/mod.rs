//! プールから貸し出されるシーケンス.
//!
//! [Sequence]は、プール内のノードへの参照と、長さのキャッシュのみを保持する軽量なハンドルである.
//!
//! ハンドルを複製(`clone`)した場合には、内容は複製されず、同じノードを指すハンドルが増えるだけとなる.
//! そのため、いずれかのハンドル経由で返却(`dispose`)や移動を伴う伸長が行われると、
//! 他の複製は古い状態を指すことになる.
//! 古いハンドルに対する操作は、エラーにはならずに単に無視される(読み込み系の操作は「空」の結果を返す).
//! 複製側で最新の長さを得るには[Sequence::refresh]を呼び出す必要がある.
//!
//! [Sequence]: ./struct.Sequence.html
//! [Sequence::refresh]: ./struct.Sequence.html#method.refresh
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use self::segments::{Iter, Segments};
pub use self::view::SequenceView;

use crate::pool::{NodeId, PoolInner, SequencePool};
use crate::{ErrorKind, Result};

mod segments;
mod view;

/// プールから借りた、論理的に連続した可変長のシーケンス.
///
/// 実体は一つ以上のセグメント上に配置されており、
/// [`segments`](#method.segments)メソッドで、その物理的な配置をそのまま参照できる.
///
/// 長さの変更は`push`と`expand`でのみ可能で、それ以外の方法で要素を挿入・削除しようとすると
/// `ErrorKind::Unsupported`エラーとなる.
///
/// # 注意
///
/// 要素の読み書きは`RefCell`経由で行われるので、
/// `segments()`が返した参照を保持したまま、同じプールに対する更新系の操作を行うとパニックする.
pub struct Sequence<T> {
    pool: Option<Rc<RefCell<PoolInner<T>>>>,
    node: NodeId,
    generation: u64,
    len: usize,
}
impl<T> Sequence<T>
where
    T: Default + Clone,
{
    pub(crate) fn new(
        pool: Rc<RefCell<PoolInner<T>>>,
        node: NodeId,
        generation: u64,
        len: usize,
    ) -> Self {
        Sequence {
            pool: Some(pool),
            node,
            generation,
            len,
        }
    }

    /// キャッシュされている長さを返す.
    ///
    /// 別のハンドル経由で返却ないし伸長された場合でも、`refresh`を呼ぶまでは値は更新されない.
    pub fn len(&self) -> usize {
        self.len
    }

    /// 長さが`0`かどうかを判定する.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// このシーケンスを貸し出したプールを返す.
    ///
    /// 空のシーケンスや、このハンドル経由で返却済みのシーケンスの場合には`None`が返される.
    pub fn owner(&self) -> Option<SequencePool<T>> {
        self.pool.as_ref().map(|p| SequencePool::from_rc(Rc::clone(p)))
    }

    /// シーケンスが返却済み(ないし空)かどうかを判定する.
    ///
    /// `refresh`とは異なり、キャッシュされている長さは更新しない.
    pub fn is_disposed(&self) -> bool {
        self.with_inner(|_, _| ()).is_none()
    }

    /// シーケンスの全体を表すビューを返す.
    pub fn as_view(&self) -> SequenceView<T> {
        SequenceView::new(self, 0, self.len)
    }

    /// シーケンスを構成するセグメント群を、アドレス順に走査するイテレータを返す.
    ///
    /// 各要素は、一つの物理セグメント内に収まる連続した部分スライスへの参照となる.
    pub fn segments(&self) -> Segments<T> {
        self.as_view().segments()
    }

    /// `index`番目の要素を返す.
    ///
    /// # Errors
    ///
    /// `index`が`[0, len)`の範囲外の場合や、シーケンスが返却済みの場合には、
    /// 種類が`ErrorKind::OutOfRange`のエラーが返される.
    pub fn get(&self, index: usize) -> Result<T> {
        track!(self.as_view().get(index))
    }

    /// `index`番目の要素を`value`で上書きする.
    ///
    /// シーケンスが返却済みの場合には何も行わない.
    ///
    /// # Errors
    ///
    /// `index`が`[0, len)`の範囲外の場合には、種類が`ErrorKind::OutOfRange`のエラーが返される.
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        track!(self.as_view().set(index, value))
    }

    /// `[start, start + len)`の範囲を表すビューを返す.
    ///
    /// # Errors
    ///
    /// 範囲がシーケンスに収まらない場合には、種類が`ErrorKind::OutOfRange`のエラーが返される.
    pub fn slice(&self, start: usize, len: usize) -> Result<SequenceView<T>> {
        track!(self.as_view().slice(start, len))
    }

    /// `start`以降の範囲を表すビューを返す.
    pub fn slice_from(&self, start: usize) -> Result<SequenceView<T>> {
        track!(self.as_view().slice_from(start))
    }

    /// 末尾に`value`を追加する.
    ///
    /// 直後に空き領域がある場合(あるいは、アドレス空間の末尾に位置する場合)には、データの移動なしで伸長される.
    /// そうではない場合には、新しい領域に内容が移された上で、元の領域は返却される.
    /// 後者の場合、このハンドルは新しい領域を指すように更新されるが、他の複製は古い領域を指したままとなる.
    ///
    /// シーケンスが返却済みないし空の場合には何も行わない.
    pub fn push(&mut self, value: T) {
        if self.expand(1) {
            let index = self.len - 1;
            self.with_inner_mut(|inner, start| {
                *inner.store.get_mut(start + index) = value;
            });
        }
    }

    /// 末尾に`n`個の`T::default()`を追加する.
    ///
    /// 伸長の方法は`push`と同様.
    /// 伸長が行われた場合には`true`が返される.
    pub fn expand(&mut self, n: usize) -> bool {
        if n == 0 {
            return false;
        }
        let (node, generation) = (self.node, self.generation);
        let grown = self
            .pool
            .as_ref()
            .and_then(|p| p.borrow_mut().grow(node, generation, n));
        if let Some((node, generation)) = grown {
            self.node = node;
            self.generation = generation;
        }
        self.refresh();
        grown.is_some()
    }

    /// キャッシュされている長さを、参照先のノードの状態に合わせて更新する.
    ///
    /// シーケンスが返却済みの場合には長さは`0`となり、このハンドルはプールから切り離される.
    /// 更新後の長さが返される.
    pub fn refresh(&mut self) -> usize {
        let (node, generation) = (self.node, self.generation);
        let len = self
            .pool
            .as_ref()
            .and_then(|p| p.borrow().active_len(node, generation));
        match len {
            Some(len) => self.len = len,
            None => self.detach(),
        }
        self.len
    }

    /// シーケンスをプールに返却する.
    ///
    /// 既に返却済みの場合や、空のシーケンスの場合には何も行わない.
    pub fn dispose(&mut self) {
        let (node, generation) = (self.node, self.generation);
        if let Some(pool) = self.pool.as_ref() {
            pool.borrow_mut().dispose(node, generation);
        }
        self.detach();
    }

    /// 全要素を`T::default()`で上書きする.
    pub fn clear(&self) {
        self.as_view().clear()
    }

    /// 全要素を`value`で上書きする.
    pub fn fill(&self, value: T) {
        self.as_view().fill(value)
    }

    /// 要素を`destination`の先頭にコピーする.
    ///
    /// # Errors
    ///
    /// `destination`がシーケンスよりも短い場合には、種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn copy_to(&self, destination: &mut [T]) -> Result<()> {
        track!(self.as_view().copy_to(destination))
    }

    /// `source`の内容を、シーケンスの先頭からコピーする.
    ///
    /// # Errors
    ///
    /// `source`がシーケンスよりも長い場合には、種類が`ErrorKind::InvalidInput`のエラーが返される.
    pub fn copy_from(&self, source: &[T]) -> Result<()> {
        track!(self.as_view().copy_from(source))
    }

    /// 内容を`Vec`にコピーして返す.
    pub fn to_vec(&self) -> Vec<T> {
        self.as_view().to_vec()
    }

    /// 要素を先頭から順に走査するイテレータを返す.
    ///
    /// 呼び出しの度に、先頭からの新しい走査が開始される.
    pub fn iter(&self) -> Iter<T> {
        self.as_view().iter()
    }

    /// `index`の位置に要素を挿入する.
    ///
    /// シーケンスは固定容量なので、このメソッドは常に`ErrorKind::Unsupported`エラーを返す.
    pub fn insert(&self, index: usize, _value: T) -> Result<()> {
        track_panic!(
            ErrorKind::Unsupported,
            "Cannot insert an element into a fixed-capacity sequence: index={}",
            index
        );
    }

    /// `index`の位置の要素を削除する.
    ///
    /// シーケンスは固定容量なので、このメソッドは常に`ErrorKind::Unsupported`エラーを返す.
    pub fn remove(&self, index: usize) -> Result<T> {
        track_panic!(
            ErrorKind::Unsupported,
            "Cannot remove an element from a fixed-capacity sequence: index={}",
            index
        );
    }

    /// 参照先のノードが有効な場合に限り、プールの内部状態とノードの開始位置を`f`に渡す.
    ///
    /// ハンドルが古くなっている場合には`f`は呼ばれずに`None`が返される.
    pub(crate) fn with_inner<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&PoolInner<T>, usize) -> R,
    {
        let pool = self.pool.as_ref()?.borrow();
        let start = pool.active_start(self.node, self.generation)?;
        Some(f(&*pool, start))
    }

    /// `with_inner`の可変版.
    pub(crate) fn with_inner_mut<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut PoolInner<T>, usize) -> R,
    {
        let mut pool = self.pool.as_ref()?.borrow_mut();
        let start = pool.active_start(self.node, self.generation)?;
        Some(f(&mut *pool, start))
    }

    fn detach(&mut self) {
        self.pool = None;
        self.len = 0;
    }
}
impl<T> Sequence<T>
where
    T: Default + Clone + PartialEq,
{
    /// `value`と等しい要素が含まれているかどうかを判定する.
    ///
    /// シーケンスが返却済みの場合には`false`が返される.
    pub fn contains(&self, value: &T) -> bool {
        self.as_view().contains(value)
    }
}
impl<T> Sequence<T>
where
    T: Default + Clone + Ord,
{
    /// 要素を昇順に並び替える.
    ///
    /// シーケンスが返却済みの場合には何も行わない.
    pub fn sort(&self) {
        self.as_view().sort()
    }
}
impl<T> Clone for Sequence<T> {
    /// 同じノードを指すハンドルを生成する.
    ///
    /// 内容は複製されない.
    fn clone(&self) -> Self {
        Sequence {
            pool: self.pool.clone(),
            node: self.node,
            generation: self.generation,
            len: self.len,
        }
    }
}
impl<T> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("node", &self.node)
            .field("generation", &self.generation)
            .field("len", &self.len)
            .field("has_owner", &self.pool.is_some())
            .finish()
    }
}
impl<T> Default for Sequence<T> {
    /// どのプールにも属さない空のシーケンスを返す.
    fn default() -> Self {
        Sequence {
            pool: None,
            node: 0,
            generation: 0,
            len: 0,
        }
    }
}
