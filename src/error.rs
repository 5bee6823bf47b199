use trackable;

/// crate固有のエラー型.
#[derive(Debug, Clone, TrackableError)]
pub struct Error(trackable::error::TrackableError<ErrorKind>);

/// 発生し得るエラーの種別.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 入力が不正.
    ///
    /// E.g., 範囲外のセグメント長を指定してプールを構築しようとした、
    /// コピー先のバッファがシーケンスよりも短い、等.
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側のプログラムを修正して入力を正しくする
    InvalidInput,

    /// シーケンスの範囲外の位置が指定された.
    ///
    /// 要素のインデックスやスライスの範囲が`[0, len)`に収まっていない場合に返される.
    ///
    /// # 典型的な対応策
    ///
    /// - `Sequence::len`を確認してから操作を行う
    /// - 別のハンドル経由で解放された可能性がある場合には`Sequence::refresh`を呼ぶ
    OutOfRange,

    /// サポートされていない操作.
    ///
    /// シーケンスは固定容量のコレクションなので、
    /// `push`/`expand`以外の方法で長さを変える操作(e.g., 挿入・削除)はこのエラーとなる.
    Unsupported,

    /// 内部状態が不整合に陥っている.
    ///
    /// プログラムにバグがあることを示している.
    ///
    /// # 典型的な対応策
    ///
    /// - バグ修正を行ってプログラムを更新する
    InconsistentState,
}
impl trackable::error::ErrorKind for ErrorKind {}
