//! CNN Architecture for Cats vs Dogs Classification
//!
//! A stack of convolution + batch-norm + ReLU blocks with spatial
//! downsampling, flattened into a fully connected classifier head with
//! dropout and a 2-unit output layer. The forward pass is a pure function
//! of the input and the parameters.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig,
        PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::model::config::ModelConfig;

/// A convolutional block: Conv2d + BatchNorm + ReLU + MaxPool(2x2)
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    relu: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a block mapping `in_channels` to `out_channels`, halving the
    /// spatial dimensions.
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [kernel_size, kernel_size])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let bn = BatchNormConfig::new(out_channels).init(device);
        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            bn,
            relu: Relu::new(),
            pool,
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Cats vs Dogs binary classifier
///
/// Architecture:
/// - 4 convolutional blocks with filters 32 -> 64 -> 128 -> 256
/// - Each block halves the spatial size (input/16 after all blocks)
/// - Flatten, then fc 512 -> 128 -> 2 with dropout between layers
#[derive(Module, Debug)]
pub struct CatDogClassifier<B: Backend> {
    conv1: ConvBlock<B>,
    conv2: ConvBlock<B>,
    conv3: ConvBlock<B>,
    conv4: ConvBlock<B>,

    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
    dropout: Dropout,
    relu: Relu,

    num_classes: usize,
}

impl<B: Backend> CatDogClassifier<B> {
    /// Create a new classifier from configuration
    pub fn new(config: &ModelConfig, device: &B::Device) -> Self {
        let [f1, f2, f3, f4] = config.conv_filters;
        let k = config.kernel_size;

        let conv1 = ConvBlock::new(config.input_channels, f1, k, device);
        let conv2 = ConvBlock::new(f1, f2, k, device);
        let conv3 = ConvBlock::new(f2, f3, k, device);
        let conv4 = ConvBlock::new(f3, f4, k, device);

        let [u1, u2] = config.fc_units;
        let fc1 = LinearConfig::new(config.flattened_features(), u1).init(device);
        let fc2 = LinearConfig::new(u1, u2).init(device);
        let fc3 = LinearConfig::new(u2, config.num_classes).init(device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();

        Self {
            conv1,
            conv2,
            conv3,
            conv4,
            fc1,
            fc2,
            fc3,
            dropout,
            relu: Relu::new(),
            num_classes: config.num_classes,
        }
    }

    /// Forward pass producing unnormalized class scores.
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, size, size]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, 2]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        // Flatten: [B, C, H, W] -> [B, C * H * W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout.forward(x);

        let x = self.fc2.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout.forward(x);

        self.fc3.forward(x)
    }

    /// Forward pass with softmax, for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
