pub mod activation;
pub mod loss;

pub trait NeuraDerivable<F> {
    fn eval(&self, input: F) -> F;

    /// Should return the derivative of `self.eval(input)`
    fn derivate(&self, at: F) -> F;
}

pub trait NeuraLoss<F> {
    /// Loss of a single sample
    fn eval(&self, target: &[F], actual: &[F]) -> F;

    /// Should return the partial derivative of the loss according to one component of `actual`
    /// ($\frac{\partial}{\partial \texttt{actual}_i} \texttt{self.eval}(\texttt{target}, \texttt{actual})$).
    fn nabla(&self, target: F, actual: F) -> F;
}
