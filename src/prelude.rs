//! Prelude

pub use crate::hw_traits::dma::DmaChannel as _msp430_extfram_DmaChannel;
pub use crate::hw_traits::eusci::EUsciSpi as _msp430_extfram_EUsciSpi;
pub use crate::hw_traits::Steal as _msp430_extfram_Steal;
pub use crate::transfer::BulkTransfer as _msp430_extfram_BulkTransfer;
pub use crate::wait::Wait as _msp430_extfram_Wait;
